#![forbid(unsafe_code)]

/// Pipeline stages in run order. Later stages re-check what earlier stages produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Stage {
    DiscoveryAgent,
    CodeAnalyzer,
    IsolationDecider,
    TestArchitect,
    TestImplementer,
}

pub(crate) const ALL_STAGES: [Stage; 5] = [
    Stage::DiscoveryAgent,
    Stage::CodeAnalyzer,
    Stage::IsolationDecider,
    Stage::TestArchitect,
    Stage::TestImplementer,
];

impl Stage {
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        ALL_STAGES.into_iter().find(|stage| stage.as_str() == raw)
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::DiscoveryAgent => "discovery-agent",
            Self::CodeAnalyzer => "code-analyzer",
            Self::IsolationDecider => "isolation-decider",
            Self::TestArchitect => "test-architect",
            Self::TestImplementer => "test-implementer",
        }
    }

    /// Key in the document's `automation` map that records this stage as done.
    pub(crate) fn completion_key(self) -> &'static str {
        match self {
            Self::DiscoveryAgent => "discovery_agent_completed",
            Self::CodeAnalyzer => "code_analyzer_completed",
            Self::IsolationDecider => "isolation_decider_completed",
            Self::TestArchitect => "test_architect_completed",
            Self::TestImplementer => "test_implementer_completed",
        }
    }

    pub(crate) fn predecessors(self) -> impl Iterator<Item = Stage> {
        ALL_STAGES.into_iter().filter(move |stage| *stage < self)
    }

    pub(crate) fn runs_analysis_checks(self) -> bool {
        self >= Self::CodeAnalyzer
    }

    pub(crate) fn requires_test_config(self) -> bool {
        self >= Self::IsolationDecider
    }

    pub(crate) fn requires_spec_file(self) -> bool {
        self >= Self::TestArchitect
    }

    pub(crate) fn forbids_placeholders(self) -> bool {
        self == Self::TestImplementer
    }

    pub(crate) fn estimates_complexity(self) -> bool {
        self == Self::CodeAnalyzer
    }
}

pub(crate) fn stage_names() -> String {
    ALL_STAGES
        .iter()
        .map(|stage| stage.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
