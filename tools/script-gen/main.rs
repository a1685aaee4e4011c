use clap::Parser;
use leadflow::data::{ConversationScript, ScriptedTurn};
use leadflow::flow::{FieldDefinition, InputKind, fields_from_json};
use rand::seq::IndexedRandom;
use rand::{Rng, rngs::ThreadRng};
use std::collections::BTreeMap;
use std::fs;

/// A CLI tool to generate conversation scripts for flow-cli replay
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Field list JSON to generate a conversation for; the built-in buyer flow when omitted
    fields_path: Option<String>,

    /// The path to write the generated JSON file to
    #[arg(short, long, default_value = "generated_script.json")]
    output: String,

    /// Chance that a turn answers nothing, forcing a re-prompt
    #[arg(long, default_value_t = 0.2)]
    miss_rate: f64,

    /// Chance that a turn also answers the following question
    #[arg(long, default_value_t = 0.3)]
    lookahead_rate: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut rng = rand::rng();

    for (name, rate) in [("--miss-rate", cli.miss_rate), ("--lookahead-rate", cli.lookahead_rate)] {
        if !(0.0..=1.0).contains(&rate) {
            eprintln!("Error: {} ({}) must be between 0 and 1", name, rate);
            std::process::exit(1);
        }
    }

    let mut script = ConversationScript::default();
    if let Some(path) = &cli.fields_path {
        script.fields = fields_from_json(&fs::read_to_string(path)?)?;
        script.flow_id = "generated".to_string();
    }
    let mut fields = script.fields.clone();
    fields.sort_by_key(|f| f.order);

    println!(
        "Generating a conversation over {} questions (miss rate {}, lookahead rate {})...",
        fields.len(),
        cli.miss_rate,
        cli.lookahead_rate
    );
    script.turns = generate_turns(&mut rng, &fields, cli.miss_rate, cli.lookahead_rate);

    fs::write(&cli.output, script.to_json()?)?;
    println!(
        "Successfully generated {} turns and saved the script to '{}'",
        script.turns.len(),
        cli.output
    );
    Ok(())
}

fn generate_turns(
    rng: &mut ThreadRng,
    fields: &[FieldDefinition],
    miss_rate: f64,
    lookahead_rate: f64,
) -> Vec<ScriptedTurn> {
    let mut turns = Vec::new();
    let mut i = 0;
    let mut missed = false;
    while i < fields.len() {
        // At most one miss per question so the script always terminates.
        if !missed && rng.random_bool(miss_rate) {
            missed = true;
            turns.push(ScriptedTurn {
                pairs: BTreeMap::new(),
                text: Some("hmm, not sure".to_string()),
            });
            continue;
        }
        missed = false;

        let mut pairs = BTreeMap::new();
        let field = &fields[i];
        if !field.required && rng.random_bool(0.5) {
            // Optional question left unanswered.
            turns.push(ScriptedTurn {
                pairs,
                text: Some("skip".to_string()),
            });
            i += 1;
            continue;
        }
        pairs.insert(field.mapping_key.clone(), generate_answer(rng, field));
        i += 1;

        if i < fields.len() && rng.random_bool(lookahead_rate) {
            let next = &fields[i];
            pairs.insert(next.mapping_key.clone(), generate_answer(rng, next));
            i += 1;
        }
        let text = pairs.values().cloned().collect::<Vec<_>>().join(", ");
        turns.push(ScriptedTurn {
            pairs,
            text: Some(text),
        });
    }

    // Contact details for the lead capture step.
    turns.push(ScriptedTurn {
        pairs: BTreeMap::from([(
            "email".to_string(),
            format!("lead{}@example.com", rng.random_range(100..1000)),
        )]),
        text: None,
    });
    turns
}

/// Produces a plausible answer for a question.
fn generate_answer(rng: &mut ThreadRng, field: &FieldDefinition) -> String {
    if field.input_kind == InputKind::ChoiceButtons {
        if let Some(choice) = field.choices.choose(rng) {
            return choice.value.clone();
        }
    }
    let key = field.mapping_key.to_lowercase();
    if key.contains("budget") || key.contains("price") {
        let thousands = rng.random_range(150..1500) * 5;
        return if rng.random_bool(0.5) {
            format!("${},000", thousands)
        } else {
            format!("{}k", thousands)
        };
    }
    if key.contains("bedroom") || key.contains("bathroom") {
        return rng.random_range(1..6).to_string();
    }
    let samples = ["downtown", "near good schools", "as soon as possible", "yes", "flexible"];
    samples.choose(rng).copied().unwrap_or("flexible").to_string()
}
