//! System-instruction construction.
//!
//! `build_instruction` is a pure function of the selected role: the base
//! consultant framing (which fixes the sectioned output contract that
//! [`crate::core::format`] recognizes) plus the role's focus block appended
//! verbatim. `General AI` skips the domain framing entirely.

use crate::core::role::ExpertiseRole;

const BASE_INSTRUCTION: &str = "You are a senior cement plant consultant and technical expert.

CRITICAL: Always respond in this professional technical format:

**Problem Statement**
[Clearly identify the issue or question being addressed]

**Analysis**
[Provide detailed technical analysis with specific parameters, causes, or considerations]

**Solution / Recommendation**
[Give actionable solutions with specific steps, parameters, or recommendations]

**Best Practices / Safety Notes**
[Include relevant safety guidelines, maintenance tips, or industry best practices]

Your expertise covers:
- Cement plant machinery troubleshooting
- Process optimization and efficiency improvements
- Safety and compliance guidelines
- Maintenance planning and predictive analysis
- Cost-saving and sustainability strategies
- Equipment specifications and vendor evaluation

Tone: Authoritative but approachable, like a senior plant consultant giving structured technical advice.
Always use bullet points, numbered steps, or tables where helpful.
Include specific technical parameters, temperatures, pressures, or measurements when relevant.";

const GENERAL_INSTRUCTION: &str = "You are a helpful general-purpose AI assistant.

Answer questions on any topic clearly and accurately. Use plain prose, with
bullet points or numbered steps only where they genuinely help. Admit
uncertainty rather than guessing.";

/// Build the system instruction for a role. Deterministic: the same role
/// always yields the same instruction, with the role's focus block included
/// exactly once.
pub fn build_instruction(role: ExpertiseRole) -> String {
    if role == ExpertiseRole::GeneralAi {
        return GENERAL_INSTRUCTION.to_string();
    }

    format!(
        "{}\n\nCurrent user department: {}\n\n{}",
        BASE_INSTRUCTION,
        role.label(),
        role.focus_block()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_is_deterministic() {
        for role in ExpertiseRole::all() {
            assert_eq!(build_instruction(role), build_instruction(role));
        }
    }

    #[test]
    fn focus_block_appears_exactly_once() {
        for role in ExpertiseRole::all() {
            if role == ExpertiseRole::GeneralAi {
                continue;
            }
            let instruction = build_instruction(role);
            assert_eq!(
                instruction.matches(role.focus_block()).count(),
                1,
                "focus block for {:?} should appear exactly once",
                role
            );
        }
    }

    #[test]
    fn domain_roles_name_their_department() {
        for role in ExpertiseRole::all() {
            if role == ExpertiseRole::GeneralAi {
                continue;
            }
            let instruction = build_instruction(role);
            assert!(instruction.contains(&format!("Current user department: {}", role.label())));
            assert!(instruction.contains("**Problem Statement**"));
        }
    }

    #[test]
    fn general_ai_bypasses_domain_framing() {
        let instruction = build_instruction(ExpertiseRole::GeneralAi);
        assert!(!instruction.contains("Current user department"));
        assert!(!instruction.contains("cement"));
        assert!(instruction.contains("general-purpose"));
    }
}
