use clap::{Parser, Subcommand, ValueEnum};
use leadflow::advice::AdviceTargeter;
use leadflow::data::ConversationScript;
use leadflow::error::FieldConversionError;
use leadflow::prelude::*;
use serde::Deserialize;
use std::fs;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

// --- JSON Deserialization Structs (Input Format Specific) ---
// The onboarding wizard exports questions in this shape; it is only used here
// for conversion.

#[derive(Deserialize)]
struct RawQuestion {
    key: String,
    question: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    concept: Option<String>,
}

#[derive(Deserialize)]
struct RawWizard {
    questions: Vec<RawQuestion>,
}

impl IntoFields for RawWizard {
    fn into_fields(self) -> std::result::Result<Vec<FieldDefinition>, FieldConversionError> {
        self.questions
            .into_iter()
            .enumerate()
            .map(|(i, q)| {
                if q.key.trim().is_empty() {
                    return Err(FieldConversionError::ValidationError(format!(
                        "question {} has no key",
                        i + 1
                    )));
                }
                let mut field = FieldDefinition::new(q.key, q.question, i as i32 + 1);
                if !q.options.is_empty() {
                    let choices = q
                        .options
                        .iter()
                        .map(|o| Choice::new(o.to_lowercase().replace(' ', "_"), o.clone(), o.clone()))
                        .collect();
                    field = field.with_choices(choices);
                }
                if q.optional {
                    field = field.optional();
                }
                if let Some(concept) = q.concept {
                    field = field.with_concept(concept);
                }
                Ok(field)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InputFormat {
    /// A JSON array of field definitions
    Fields,
    /// An onboarding wizard export: `{"questions": [...]}`
    Wizard,
}

/// Compile lead-capture flows and replay scripted conversations
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional engine configuration JSON file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a field list and print the resulting state machine
    Compile {
        /// Path to the field list JSON file
        fields_path: String,
        #[arg(short, long, value_enum, default_value = "fields")]
        format: InputFormat,
        #[arg(long, default_value = "default")]
        flow_id: String,
        /// Write the compiled machine as a binary artifact
        #[arg(short, long)]
        artifact: Option<String>,
    },
    /// Replay a conversation script turn by turn
    Replay {
        /// Path to the script JSON file; a built-in demo is used when omitted
        script_path: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let engine_config = match &cli.config {
        Some(path) => EngineConfig::from_file(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load engine config '{}': {}", path, e))
        }),
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Compile {
            fields_path,
            format,
            flow_id,
            artifact,
        } => run_compile(&engine_config, &fields_path, format, &flow_id, artifact.as_deref()),
        Command::Replay { script_path } => run_replay(&engine_config, script_path.as_deref()),
    }
}

fn load_fields(path: &str, format: InputFormat) -> Vec<FieldDefinition> {
    let json = fs::read_to_string(path)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read '{}': {}", path, e)));
    let fields = match format {
        InputFormat::Fields => fields_from_json(&json)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse field list: {}", e)))
            .into_fields(),
        InputFormat::Wizard => serde_json::from_str::<RawWizard>(&json)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse wizard export: {}", e)))
            .into_fields(),
    };
    fields.unwrap_or_else(|e| exit_with_error(&format!("Failed to convert questions: {}", e)))
}

fn run_compile(
    engine_config: &EngineConfig,
    fields_path: &str,
    format: InputFormat,
    flow_id: &str,
    artifact: Option<&str>,
) {
    let fields = load_fields(fields_path, format);

    let compile_start = Instant::now();
    let config = FlowCompiler::builder(fields)
        .with_flow_id(flow_id)
        .with_config(engine_config)
        .build()
        .compile()
        .unwrap_or_else(|e| exit_with_error(&format!("Compilation failed: {}", e)));
    let compile_duration = compile_start.elapsed();

    println!("{}", visualize_config(&config));
    println!(
        "Compiled {} states in {:?}",
        config.states.len(),
        compile_duration
    );

    if let Some(path) = artifact {
        config
            .save(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to write artifact: {}", e)));
        println!("Artifact written to '{}'", path);
    }
}

fn run_replay(engine_config: &EngineConfig, script_path: Option<&str>) {
    let script = match script_path {
        Some(path) => ConversationScript::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load script: {}", e))),
        None => {
            println!("No script provided. Using the built-in buyer conversation.");
            ConversationScript::default()
        }
    };
    let advice = script
        .advice_items()
        .unwrap_or_else(|e| exit_with_error(&format!("Invalid advice item: {}", e)));

    let config = FlowCompiler::builder(script.fields.clone())
        .with_flow_id(script.flow_id.clone())
        .with_config(engine_config)
        .build()
        .compile()
        .unwrap_or_else(|e| exit_with_error(&format!("Compilation failed: {}", e)));
    let concepts = ConceptMap::from_fields(&script.fields);
    let controller = SessionController::new(&config);
    let targeter =
        AdviceTargeter::new(engine_config.advice_limit_per_state).with_concepts(&concepts);

    let (mut session, _) = controller
        .start("replay", script.prefilled_answers(), chrono::Utc::now())
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to start session: {}", e)));
    print_state(&config, &session, &targeter, &advice);

    for (i, turn) in script.turns.iter().enumerate() {
        println!("\n--- Turn {} ---", i + 1);
        if let Some(text) = &turn.text {
            println!("User: {}", text);
        }
        let outcome = controller
            .apply_turn(&mut session, turn.pairs.iter(), chrono::Utc::now())
            .unwrap_or_else(|e| exit_with_error(&format!("Turn failed: {}", e)));
        match &outcome {
            TurnOutcome::Advanced { new_state_id, skipped } if !skipped.is_empty() => {
                println!("-> Advanced to {} (skipped {})", new_state_id, skipped.join(", "))
            }
            TurnOutcome::Advanced { new_state_id, .. } => println!("-> Advanced to {}", new_state_id),
            TurnOutcome::Stayed { state_id, reason } => println!("-> Stayed at {} ({})", state_id, reason),
            TurnOutcome::Completed => {
                println!("-> Completed");
                break;
            }
        }
        print_state(&config, &session, &targeter, &advice);
    }

    println!("\n--- Collected Answers ---");
    let mut answers: Vec<_> = session.answers.iter().collect();
    answers.sort();
    for (key, value) in answers {
        println!("{:<20} {}", key, value);
    }
    println!("Status: {}", session.status);
}

fn print_state(
    config: &StateMachineConfig,
    session: &SessionState,
    targeter: &AdviceTargeter<'_>,
    advice: &[AdviceItem],
) {
    let Some(state) = config.state(&session.current_state_id) else {
        exit_with_error(&format!("Unknown state '{}'", session.current_state_id));
    };
    println!("Bot: {}", state.prompt);
    for choice in &state.choices {
        println!("     [{}]", choice.label);
    }
    for selected in targeter.select_for_state(advice, state, &session.answers) {
        println!(
            "     advice: {} ({:?}, score {:.2})",
            selected.item.title, selected.basis, selected.score
        );
        if let Some(reason) = selected.reason {
            println!("       because {}", reason);
        }
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
