use clap::{Parser, Subcommand};
use encounter_core::{
    AutocompleteField, CodedValue, ConceptSubset, CoreConfig, FhirTerminologyClient,
    LateralityOutcome, LateralityResolver, TerminologyService,
};
use fhir::ExpandRequest;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "encounter")]
#[command(about = "SNOMED CT lookups for the encounter form")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the concepts offered by an autocomplete field
    Search {
        /// reason_for_encounter, diagnosis or procedure
        field: AutocompleteField,
        /// Text to filter by
        text: String,
        /// Maximum number of results (defaults to ENCOUNTER_RESULT_COUNT)
        #[arg(long)]
        count: Option<u32>,
    },
    /// Resolve the laterality of a procedure
    Laterality {
        /// Procedure SNOMED CT identifier
        code: String,
        /// Procedure display (optional)
        #[arg(long, default_value = "")]
        display: String,
    },
    /// List the laterality values offered by the picker
    Lateralities,
    /// List preferred diagnoses matching a term
    Preferred {
        /// Search term (optional, lists all when omitted)
        term: Option<String>,
        /// Also expand the preferred diagnosis list on the terminology server
        #[arg(long)]
        remote: bool,
    },
}

fn print_concepts(concepts: &[CodedValue]) {
    if concepts.is_empty() {
        println!("No concepts found.");
    }
    for concept in concepts {
        println!("{}\t{}", concept.value, concept.display);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    let cfg = CoreConfig::from_env()?;
    let client = FhirTerminologyClient::from_config(&cfg)?;

    match command {
        Commands::Search { field, text, count } => {
            let request = ConceptSubset::from(field)
                .request(Some(count.unwrap_or(cfg.result_count())))?
                .with_filter(&text);
            let concepts = client.expand(&request).await?;
            print_concepts(&concepts);
        }
        Commands::Laterality { code, display } => {
            let procedure = CodedValue::new(code, display);
            let resolver = LateralityResolver::new(Arc::new(client));
            match resolver.resolve(&procedure).await? {
                LateralityOutcome::NoSite => {
                    println!("{} has no procedure site; laterality disabled", procedure.value)
                }
                LateralityOutcome::SiteWithoutLaterality => {
                    println!("{} has a site but no laterality", procedure.value)
                }
                LateralityOutcome::Lateralised(laterality) => {
                    println!("{}\t{}", laterality.value, laterality.display)
                }
            }
        }
        Commands::Lateralities => {
            let resolver = LateralityResolver::new(Arc::new(client));
            print_concepts(&resolver.options().await?);
        }
        Commands::Preferred { term, remote } => {
            let term = term.unwrap_or_default();
            let preferred = cfg.preferred_diagnoses();
            print_concepts(&preferred.matching(&term));

            if remote {
                let Some(ecl) = preferred.ecl() else {
                    anyhow::bail!("preferred diagnosis list is empty");
                };
                let request = ExpandRequest::ecl(ecl)?
                    .with_count(cfg.result_count())
                    .with_filter(&term);
                println!("-- {}", client.server());
                print_concepts(&client.expand(&request).await?);
            }
        }
    }

    Ok(())
}
