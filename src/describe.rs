//! Built-in documentation behind `refinebio describe`.

pub const USAGE: &str = "\
describe

Prints information about refinebio's types and functions. To get
information about a method, pass the type name and the method name
separated by either a space or a `.`

usage:

    refinebio describe Sample
    refinebio describe Sample.get
    refinebio describe \"Sample get\"
    refinebio describe download_dataset
";

struct Topic {
    name: &'static str,
    summary: &'static str,
    /// `(argument, endpoint)` for `get`, when the type can be fetched alone.
    lookup: Option<(&'static str, &'static str)>,
    /// Search filters, when the type can be searched.
    filters: Option<&'static str>,
    methods: &'static [(&'static str, &'static str)],
}

const TOPICS: &[Topic] = &[
    Topic {
        name: "Experiment",
        summary: "A refine.bio experiment, identified by its accession code (e.g. GSE68833).",
        lookup: Some(("accession_code", "experiments/{accession_code}/")),
        filters: Some(
            "technology, has_publication, accession_code, alternate_accession_code, platform, \
             organism, downloadable_organism, num_processed_samples, num_downloadable_samples, \
             sample_keywords, search, ordering, limit, offset",
        ),
        methods: &[("samples", "The samples of this experiment.")],
    },
    Topic {
        name: "Sample",
        summary: "A sample, identified by its accession code (e.g. GSM1234).",
        lookup: Some(("accession_code", "samples/{accession_code}/")),
        filters: Some(
            "title, organism__name, organism__taxonomy_id, source_database, source_archive_url, \
             has_raw, platform_name, technology, manufacturer, sex, age, specimen_part, genotype, \
             disease, disease_stage, cell_line, treatment, race, subject, compound, time, \
             is_processed, dataset_id, experiment_accession_code, accession_codes, ordering, \
             limit, offset",
        ),
        methods: &[
            ("experiments", "Searches the experiments this sample belongs to."),
            ("organism", "The organism the sample was taken from."),
            ("original_files", "The raw files the sample was processed from."),
            ("computed_files", "Files computed from this sample."),
        ],
    },
    Topic {
        name: "Dataset",
        summary: "A server-side bundle of experiments and samples that can be processed and \
                  downloaded. Moves through unsaved, saved, processing and processed.",
        lookup: Some(("id", "dataset/{id}/")),
        filters: None,
        methods: &[
            ("new", "Creates an unsaved dataset locally."),
            ("edit", "Changes local fields. Nothing is sent until save."),
            (
                "add_samples",
                "Adds samples of one experiment; no samples means ALL. Ignored once the dataset \
                 is processing or processed.",
            ),
            ("save", "Creates (POST) or updates (PUT) the dataset on the server."),
            ("process", "Sets start and saves, which queues the dataset for processing."),
            ("check", "Refreshes the processing state and returns whether it is processed."),
            ("download", "Downloads the processed archive. Requires an activated token."),
            ("extract", "Unpacks the downloaded archive next to it."),
        ],
    },
    Topic {
        name: "ComputedFile",
        summary: "A file produced by a refine.bio processing step.",
        lookup: Some(("id", "computed_files/{id}/")),
        filters: Some(
            "id, samples, is_qn_target, is_smashable, is_qc, is_compendia, quant_sf_only, \
             svd_algorithm, compendia_version, created_at, last_modified, result__id, ordering, \
             limit, offset",
        ),
        methods: &[
            ("download", "Downloads the file. Requires an activated token."),
            ("extract", "Unpacks the downloaded file if it is an archive."),
        ],
    },
    Topic {
        name: "Compendium",
        summary: "A normalized or RNA-seq sample compendium for one organism.",
        lookup: Some(("id", "compendia/{id}/")),
        filters: Some(
            "primary_organism__name, compendium_version, quant_sf_only, result__id, \
             latest_version, ordering, limit, offset",
        ),
        methods: &[
            ("download", "Downloads the compendium. Requires an activated token."),
            ("extract", "Unpacks the downloaded compendium."),
        ],
    },
    Topic {
        name: "Organism",
        summary: "An organism, identified by its upper-case name (e.g. HOMO_SAPIENS).",
        lookup: Some(("name", "organisms/{name}/")),
        filters: Some("has_compendia, has_quantfile_compendia"),
        methods: &[],
    },
    Topic {
        name: "ComputationalResult",
        summary: "The outcome of running one processor.",
        lookup: Some(("id", "computational_results/{id}/")),
        filters: Some("processor__id, limit, offset"),
        methods: &[],
    },
    Topic {
        name: "OriginalFile",
        summary: "A raw file as obtained from its source repository.",
        lookup: Some(("id", "original_files/{id}/")),
        filters: Some(
            "id, filename, samples, size_in_bytes, sha1, processor_jobs, downloader_jobs, \
             source_url, is_archive, source_filename, has_raw, created_at, last_modified, \
             ordering, limit, offset",
        ),
        methods: &[],
    },
    Topic {
        name: "DownloaderJob",
        summary: "A job that fetched original files from a source repository.",
        lookup: Some(("id", "jobs/downloader/{id}/")),
        filters: Some(
            "id, downloader_task, num_retries, retried, was_recreated, worker_id, ram_amount, \
             worker_version, batch_job_id, failure_reason, success, original_files, start_time, \
             end_time, created_at, last_modified, sample_accession_code, ordering, limit, offset",
        ),
        methods: &[],
    },
    Topic {
        name: "ProcessorJob",
        summary: "A job that ran a processing pipeline.",
        lookup: Some(("id", "jobs/processor/{id}/")),
        filters: Some(
            "id, pipeline_applied, num_retries, retried, worker_id, ram_amount, volume_index, \
             worker_version, failure_reason, batch_job_id, success, original_files, datasets, \
             start_time, end_time, created_at, last_modified, sample_accession_code, ordering, \
             limit, offset",
        ),
        methods: &[],
    },
    Topic {
        name: "SurveyJob",
        summary: "A job that surveyed a source database.",
        lookup: Some(("id", "jobs/survey/{id}/")),
        filters: Some(
            "id, source_type, success, ram_amount, start_time, end_time, created_at, \
             last_modified, ordering, limit, offset",
        ),
        methods: &[],
    },
    Topic {
        name: "Processor",
        summary: "A processing step: pipeline name, version and container image.",
        lookup: Some(("id", "processors/{id}/")),
        filters: Some("none; always lists every processor"),
        methods: &[],
    },
    Topic {
        name: "TranscriptomeIndex",
        summary: "A salmon transcriptome index for one organism.",
        lookup: Some(("id", "transcriptome_indices/{id}/")),
        filters: Some(
            "salmon_version, index_type (TRANSCRIPTOME_LONG or TRANSCRIPTOME_SHORT), \
             length (long or short), organism__name, ordering, limit, offset",
        ),
        methods: &[],
    },
    Topic {
        name: "QnTarget",
        summary: "The quantile-normalization target of one organism.",
        lookup: Some(("organism_name", "qn_targets/{organism_name}/")),
        filters: None,
        methods: &[(
            "organisms",
            "Lists every organism that has a QN target (qn_targets/, not paginated).",
        )],
    },
    Topic {
        name: "Platform",
        summary: "A platform (array or sequencer) samples were assayed on.",
        lookup: None,
        filters: None,
        methods: &[("all", "Lists every platform (platforms/, not paginated).")],
    },
    Topic {
        name: "Institution",
        summary: "A submitter institution.",
        lookup: None,
        filters: None,
        methods: &[("all", "Lists every institution (institutions/, not paginated).")],
    },
    Topic {
        name: "Token",
        summary: "An API token. Activating it records agreement with the refine.bio Terms of \
                  Use (https://www.refine.bio/terms) and Privacy Policy \
                  (https://www.refine.bio/privacy).",
        lookup: Some(("id", "token/{id}/")),
        filters: None,
        methods: &[
            ("create", "Requests a new, unactivated token."),
            ("load", "The token from the config file or REFINEBIO_TOKEN, without a request."),
            (
                "agree_to_terms_and_conditions",
                "Activates the token and uses it as the API key from then on.",
            ),
            (
                "save",
                "Writes the token to the config file (REFINEBIO_CONFIG_FILE or \
                 ~/.refinebio.yaml). The token must exist and be activated.",
            ),
        ],
    },
];

const FUNCTIONS: &[(&str, &str)] = &[
    (
        "download_dataset",
        "download_dataset\n\nBuilds a Dataset from either a dataset dict or a list of \
         experiments, processes it, waits for processing to finish (optionally bounded by a \
         timeout) and downloads it to the given path.\n\nparameters: path, email_address, \
         dataset_dict, experiments, aggregation (EXPERIMENT), transformation (NONE), \
         skip_quantile_normalization, timeout, notify_me",
    ),
    (
        "download_compendium",
        "download_compendium\n\nDownloads the latest compendium for an organism.\n\n\
         parameters: path, organism, quant_sf_only",
    ),
    (
        "download_quantfile_compendium",
        "download_quantfile_compendium\n\nDownloads the latest RNA-seq sample compendium \
         (quant.sf files only) for an organism.\n\nparameters: path, organism",
    ),
    ("describe", USAGE),
    ("help", USAGE),
];

/// Looks up documentation for `Type`, `Type.method`, `Type method` or a
/// function name. Case-insensitive. `None` returns the usage text.
pub fn describe(entity: Option<&str>) -> Option<String> {
    let Some(entity) = entity.map(str::trim).filter(|entity| !entity.is_empty()) else {
        return Some(USAGE.to_string());
    };
    let parts: Vec<&str> = entity
        .split(['.', ' '])
        .filter(|part| !part.is_empty())
        .collect();

    match parts.as_slice() {
        [name] => describe_type(name).or_else(|| {
            FUNCTIONS
                .iter()
                .find(|(function, _)| function.eq_ignore_ascii_case(name))
                .map(|(_, doc)| (*doc).to_string())
        }),
        [name, method] => describe_method(name, method),
        _ => None,
    }
}

fn topic(name: &str) -> Option<&'static Topic> {
    TOPICS.iter().find(|topic| topic.name.eq_ignore_ascii_case(name))
}

fn describe_type(name: &str) -> Option<String> {
    let topic = topic(name)?;
    let mut doc = format!("{}\n\n{}\n", topic.name, topic.summary);
    if let Some((argument, _)) = topic.lookup {
        doc.push_str(&format!(
            "\nRetrieve one {} by {argument}:\n\n    {}::get(&api, {argument})\n",
            topic.name, topic.name
        ));
    }
    if topic.filters.is_some() {
        doc.push_str(&format!(
            "\nSearch with filters:\n\n    {}::search(&api, &Filters::new().with(..))\n",
            topic.name
        ));
    }
    if !topic.methods.is_empty() {
        doc.push_str("\nmethods:\n");
        for (method, summary) in topic.methods {
            doc.push_str(&format!("\n    {method}: {summary}"));
        }
        doc.push('\n');
    }
    Some(doc)
}

fn describe_method(name: &str, method: &str) -> Option<String> {
    let topic = topic(name)?;
    if method.eq_ignore_ascii_case("get") {
        let (argument, endpoint) = topic.lookup?;
        return Some(format!(
            "{}.get\n\nRetrieve a {} based on {argument} (GET {endpoint}).\n\nreturns: {}",
            topic.name, topic.name, topic.name
        ));
    }
    if method.eq_ignore_ascii_case("search") {
        let filters = topic.filters?;
        return Some(format!(
            "{}.search\n\nRetrieve a paginated list of {} based on filters.\n\n\
             returns: PaginatedList of {}\n\nfilters: {filters}",
            topic.name, topic.name, topic.name
        ));
    }
    topic
        .methods
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(method))
        .map(|(candidate, summary)| format!("{}.{candidate}\n\n{summary}", topic.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_and_spaced_names_match() {
        let dotted = describe(Some("Sample.get")).unwrap();
        assert_eq!(describe(Some("sample get")), Some(dotted.clone()));
        assert!(dotted.contains("samples/{accession_code}/"));
    }

    #[test]
    fn types_and_functions() {
        assert!(describe(Some("Dataset")).unwrap().contains("add_samples"));
        assert!(
            describe(Some("download_quantfile_compendium"))
                .unwrap()
                .contains("quant.sf")
        );
        assert_eq!(describe(None).as_deref(), Some(USAGE));
    }

    #[test]
    fn unknown_names() {
        assert_eq!(describe(Some("Spaceship")), None);
        assert_eq!(describe(Some("Platform.get")), None);
        assert_eq!(describe(Some("Sample.fly")), None);
    }
}
