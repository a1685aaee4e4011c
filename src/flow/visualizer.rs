use super::{StateMachineConfig, TransitionCondition};
use std::fmt::Write;

/// Formats a complete `StateMachineConfig` into a human-readable listing.
pub fn visualize_config(config: &StateMachineConfig) -> String {
    let mut output = String::new();
    writeln!(
        &mut output,
        "======== STATE MACHINE: {} (v{}) ========",
        config.id, config.version
    )
    .unwrap();
    writeln!(&mut output, "initial: {}", config.initial_state_id).unwrap();

    for (i, state) in config.states.iter().enumerate() {
        let mut flags = Vec::new();
        if state.skip_if_already_known {
            flags.push("skip-if-known".to_string());
        }
        if !state.is_terminal() {
            flags.push(format!("max-attempts={}", state.max_attempts));
        }
        writeln!(
            &mut output,
            "\n{:02}: {} [{}] {}",
            i,
            state.id,
            state.kind,
            flags.join(" ")
        )
        .unwrap();

        for field in &state.collects {
            let marker = if field.required { "*" } else { " " };
            writeln!(&mut output, "    collects {}{} ({})", marker, field.mapping_key, field.label)
                .unwrap();
        }

        for transition in state.ordered_transitions() {
            writeln!(
                &mut output,
                "    p{:<3} {:<28} -> {}",
                transition.priority,
                transition.condition.to_string(),
                transition.target_state_id
            )
            .unwrap();
            // Rule trees are printed in full under their edge.
            if let TransitionCondition::RuleMatch { rule_group } = &transition.condition {
                for line in rule_group.to_string().lines() {
                    writeln!(&mut output, "          {}", line).unwrap();
                }
            }
        }
    }

    writeln!(
        &mut output,
        "\n================ END OF MACHINE ================"
    )
    .unwrap();
    output
}
