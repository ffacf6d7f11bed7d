use serde::{Deserialize, Serialize};

/// Professional expertise areas the assistant can be conditioned on.
///
/// The set is closed: adding a role means adding a variant plus one
/// [`RoleSpec`] row in [`ROLE_TABLE`]. `GeneralAi` is a pseudo-role that
/// bypasses domain framing entirely; the CLI restricts it to signed-in
/// users, the prompt builder itself does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExpertiseRole {
    Operations,
    ProjectManagement,
    SalesMarketing,
    Procurement,
    ErectionCommissioning,
    EngineeringDesign,
    GeneralAi,
}

pub struct RoleSpec {
    pub role: ExpertiseRole,
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub focus: &'static str,
}

pub const ROLE_TABLE: &[RoleSpec] = &[
    RoleSpec {
        role: ExpertiseRole::Operations,
        id: "operations",
        label: "Operations & Maintenance",
        description: "Machinery troubleshooting & process optimization",
        focus: "For Operations & Maintenance:
- Prioritize machinery troubleshooting steps and diagnostic checklists
- Focus on process optimization and efficiency improvements
- Include maintenance schedules and predictive-analysis guidance
- Emphasize uptime, energy consumption, and housekeeping targets",
    },
    RoleSpec {
        role: ExpertiseRole::ProjectManagement,
        id: "project-management",
        label: "Project Management",
        description: "EPC scheduling & resource planning",
        focus: "For Project Management:
- Focus on EPC scheduling, milestones, and resource planning
- Provide risk registers, dependency tracking, and progress metrics
- Include contractor coordination and interface management guidance
- Emphasize cost control and claims avoidance",
    },
    RoleSpec {
        role: ExpertiseRole::SalesMarketing,
        id: "sales-marketing",
        label: "Sales & Marketing",
        description: "Market analysis & customer strategies",
        focus: "For Sales & Marketing:
- Highlight product features, USPs, and competitive advantages
- Focus on customer value propositions and ROI benefits
- Include market positioning, industry trends, and performance comparisons
- Emphasize technical selling points and cost justifications",
    },
    RoleSpec {
        role: ExpertiseRole::Procurement,
        id: "procurement",
        label: "Procurement & Supply Chain",
        description: "Vendor negotiations & inventory optimization",
        focus: "For Procurement & Supply Chain:
- Guide on vendor evaluation criteria and specifications
- Provide cost-benefit analysis and quality parameters
- Include supplier assessment guidelines and inventory optimization
- Focus on technical requirements and compliance standards",
    },
    RoleSpec {
        role: ExpertiseRole::ErectionCommissioning,
        id: "erection-commissioning",
        label: "Erection & Commissioning",
        description: "Installation sequencing & safety compliance",
        focus: "For Erection & Commissioning:
- Provide practical erection sequencing and commissioning guidance
- Focus on troubleshooting procedures and safety protocols
- Include operational procedures and pre-commissioning checklists
- Emphasize hands-on solutions and field-tested practices",
    },
    RoleSpec {
        role: ExpertiseRole::EngineeringDesign,
        id: "engineering-design",
        label: "Engineering & Design",
        description: "Process flow design & equipment selection",
        focus: "For Engineering & Design:
- Provide detailed design parameters and calculations
- Include optimization strategies and technical specifications
- Focus on process flow design and equipment selection
- Provide troubleshooting methodologies and root cause analysis",
    },
    RoleSpec {
        role: ExpertiseRole::GeneralAi,
        id: "general-ai",
        label: "General AI",
        description: "General-purpose assistant without domain framing",
        focus: "",
    },
];

impl ExpertiseRole {
    pub fn spec(self) -> &'static RoleSpec {
        ROLE_TABLE
            .iter()
            .find(|spec| spec.role == self)
            .expect("ROLE_TABLE carries one row per variant")
    }

    pub fn id(self) -> &'static str {
        self.spec().id
    }

    pub fn label(self) -> &'static str {
        self.spec().label
    }

    pub fn description(self) -> &'static str {
        self.spec().description
    }

    pub fn focus_block(self) -> &'static str {
        self.spec().focus
    }

    /// Roles that are only offered to signed-in users.
    pub fn requires_account(self) -> bool {
        matches!(self, ExpertiseRole::GeneralAi)
    }

    pub fn all() -> impl Iterator<Item = ExpertiseRole> {
        ROLE_TABLE.iter().map(|spec| spec.role)
    }
}

impl Default for ExpertiseRole {
    fn default() -> Self {
        ExpertiseRole::Operations
    }
}

impl AsRef<str> for ExpertiseRole {
    fn as_ref(&self) -> &str {
        self.id()
    }
}

impl TryFrom<&str> for ExpertiseRole {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let wanted = value.trim();
        ROLE_TABLE
            .iter()
            .find(|spec| {
                spec.id.eq_ignore_ascii_case(wanted) || spec.label.eq_ignore_ascii_case(wanted)
            })
            .map(|spec| spec.role)
            .ok_or_else(|| {
                let available: Vec<&str> = ROLE_TABLE.iter().map(|spec| spec.id).collect();
                format!(
                    "Role '{}' not found. Available roles: {}",
                    wanted,
                    available.join(", ")
                )
            })
    }
}

impl TryFrom<String> for ExpertiseRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<ExpertiseRole> for String {
    fn from(value: ExpertiseRole) -> Self {
        value.id().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_variant() {
        for role in ExpertiseRole::all() {
            // spec() panics if a variant has no table row.
            assert_eq!(role.spec().role, role);
        }
        assert_eq!(ROLE_TABLE.len(), ExpertiseRole::all().count());
    }

    #[test]
    fn roles_parse_from_id_and_label() {
        assert_eq!(
            ExpertiseRole::try_from("procurement"),
            Ok(ExpertiseRole::Procurement)
        );
        assert_eq!(
            ExpertiseRole::try_from("Erection & Commissioning"),
            Ok(ExpertiseRole::ErectionCommissioning)
        );
        assert_eq!(
            ExpertiseRole::try_from("GENERAL-AI"),
            Ok(ExpertiseRole::GeneralAi)
        );
    }

    #[test]
    fn unknown_role_errors_list_the_choices() {
        let err = ExpertiseRole::try_from("quarry").unwrap_err();
        assert!(err.contains("'quarry'"));
        assert!(err.contains("operations"));
        assert!(err.contains("general-ai"));
    }

    #[test]
    fn only_general_ai_requires_an_account() {
        for role in ExpertiseRole::all() {
            assert_eq!(role.requires_account(), role == ExpertiseRole::GeneralAi);
        }
    }

    #[test]
    fn roles_serialize_as_their_ids() {
        let json = serde_json::to_string(&ExpertiseRole::SalesMarketing).expect("serialize");
        assert_eq!(json, "\"sales-marketing\"");

        let back: ExpertiseRole = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, ExpertiseRole::SalesMarketing);
    }
}
