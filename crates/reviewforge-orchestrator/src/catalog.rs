use reviewforge_core::{dimension, AgentDescriptor, AgentTier};

/// Built-in reviewer catalog used when no `[[agents]]` are configured.
///
/// Covers every review dimension the classifier emits, a coordinator for
/// hierarchical teams, and one specialist per common language.
pub fn default_catalog() -> Vec<AgentDescriptor> {
    let mut agents = vec![
        security_auditor(),
        code_quality_reviewer(),
        test_engineer(),
        performance_engineer(),
        documentation_reviewer(),
        compliance_auditor(),
        architecture_reviewer(),
        operations_reviewer(),
        review_coordinator(),
    ];
    agents.extend(language_specialists());
    agents
}

fn security_auditor() -> AgentDescriptor {
    AgentDescriptor::new("security-auditor")
        .with_capability(dimension::SECURITY, 0.95)
        .with_capability(dimension::COMPLIANCE, 0.5)
        .with_capability(dimension::CODE_QUALITY, 0.3)
        .with_domains(["auth", "payments", "api", "web"])
        .with_tier(AgentTier::Premium)
}

fn code_quality_reviewer() -> AgentDescriptor {
    AgentDescriptor::new("code-quality-reviewer")
        .with_capability(dimension::CODE_QUALITY, 0.9)
        .with_capability(dimension::ARCHITECTURE, 0.4)
        .with_capability(dimension::DOCUMENTATION, 0.3)
        .with_tier(AgentTier::Standard)
        .implementer()
}

fn test_engineer() -> AgentDescriptor {
    AgentDescriptor::new("test-engineer")
        .with_capability(dimension::TESTING, 0.95)
        .with_capability(dimension::CODE_QUALITY, 0.4)
        .with_tier(AgentTier::Standard)
        .implementer()
}

fn performance_engineer() -> AgentDescriptor {
    AgentDescriptor::new("performance-engineer")
        .with_capability(dimension::PERFORMANCE, 0.9)
        .with_capability(dimension::ARCHITECTURE, 0.3)
        .with_domains(["database", "infrastructure"])
        .with_tier(AgentTier::Premium)
}

fn documentation_reviewer() -> AgentDescriptor {
    AgentDescriptor::new("documentation-reviewer")
        .with_capability(dimension::DOCUMENTATION, 0.9)
        .with_capability(dimension::CODE_QUALITY, 0.2)
        .with_tier(AgentTier::Economy)
}

fn compliance_auditor() -> AgentDescriptor {
    AgentDescriptor::new("compliance-auditor")
        .with_capability(dimension::COMPLIANCE, 0.95)
        .with_capability(dimension::SECURITY, 0.5)
        .with_domains(["healthcare", "payments"])
        .with_tier(AgentTier::Premium)
}

fn architecture_reviewer() -> AgentDescriptor {
    AgentDescriptor::new("architecture-reviewer")
        .with_capability(dimension::ARCHITECTURE, 0.9)
        .with_capability(dimension::PERFORMANCE, 0.4)
        .with_capability(dimension::CODE_QUALITY, 0.5)
        .with_tier(AgentTier::Premium)
}

fn operations_reviewer() -> AgentDescriptor {
    AgentDescriptor::new("operations-reviewer")
        .with_capability(dimension::OPERATIONS, 0.9)
        .with_capability(dimension::SECURITY, 0.3)
        .with_domains(["infrastructure"])
        .with_languages(["hcl", "yaml", "shell"])
        .with_tier(AgentTier::Standard)
}

fn review_coordinator() -> AgentDescriptor {
    AgentDescriptor::new("review-coordinator")
        .with_capability(dimension::COORDINATION, 0.95)
        .with_capability(dimension::ARCHITECTURE, 0.6)
        .with_capability(dimension::CODE_QUALITY, 0.5)
        .with_tier(AgentTier::Premium)
}

fn language_specialists() -> Vec<AgentDescriptor> {
    [
        ("python-specialist", &["python"][..], &["web", "api", "ml"][..]),
        ("rust-specialist", &["rust"][..], &["infrastructure"][..]),
        ("typescript-specialist", &["typescript", "javascript"][..], &["web"][..]),
        ("go-specialist", &["go"][..], &["api", "infrastructure"][..]),
        ("java-specialist", &["java", "kotlin"][..], &["api"][..]),
        ("sql-specialist", &["sql"][..], &["database"][..]),
    ]
    .into_iter()
    .map(|(id, languages, domains)| {
        AgentDescriptor::new(id)
            .with_capability(dimension::CODE_QUALITY, 0.7)
            .with_capability(dimension::TESTING, 0.4)
            .with_capability(dimension::PERFORMANCE, 0.3)
            .with_languages(languages.iter().copied())
            .with_domains(domains.iter().copied())
            .with_tier(AgentTier::Standard)
            .implementer()
    })
    .collect()
}
