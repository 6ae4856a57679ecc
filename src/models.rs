//! Typed records for every refine.bio resource and their lazy entity
//! wrappers.

pub mod annotation;
pub mod compendium;
pub mod computational_result;
pub mod computed_file;
pub mod dataset;
pub mod experiment;
pub mod institution;
pub mod job;
pub mod organism;
pub mod original_file;
pub mod platform;
pub mod processor;
pub mod qn_target;
pub mod sample;
pub mod token;
pub mod transcriptome_index;

pub use annotation::Annotation;
pub use compendium::{Compendium, CompendiumRecord};
pub use computational_result::{ComputationalResult, ComputationalResultRecord};
pub use computed_file::{ComputedFile, ComputedFileRecord};
pub use dataset::{ALL_SAMPLES, Dataset, DatasetRecord};
pub use experiment::{Experiment, ExperimentRecord};
pub use institution::Institution;
pub use job::{
    DownloaderJob, DownloaderJobRecord, ProcessorJob, ProcessorJobRecord, SurveyJob,
    SurveyJobRecord,
};
pub use organism::{Organism, OrganismRecord};
pub use original_file::{OriginalFile, OriginalFileRecord};
pub use platform::Platform;
pub use processor::{Processor, ProcessorRecord};
pub use qn_target::{QnTarget, QnTargetRecord};
pub use sample::{Sample, SampleRecord};
pub use token::{Token, TokenRecord};
pub use transcriptome_index::{TranscriptomeIndex, TranscriptomeIndexRecord};
