//! Interest-filter classification tests

use jobscout::{Job, SmartMatcher};

fn job(title: &str, company: &str) -> Job {
    Job::new("1", title, company, "https://jobs.example/1", "test")
}

#[test]
fn excluded_titles_score_zero_everywhere() {
    let matcher = SmartMatcher::default();
    let excluded = [
        "Senior Software Engineer",
        "Full Stack Developer",
        "DevOps Lead",
        "Machine Learning Researcher",
        "Product Manager, Payments",
    ];
    for title in excluded {
        let j = job(title, "AnyCo");
        let scores = matcher.match_scores(&j);
        assert!(
            scores.values().all(|&s| s == 0),
            "{title} should score zero: {scores:?}"
        );
        assert!(!matcher.is_relevant(&j), "{title} should not be relevant");
    }
}

#[test]
fn support_specialist_matches_expected_categories() {
    let matcher = SmartMatcher::default();
    let j = job("Customer Support Specialist", "AnyCo");
    let scores = matcher.match_scores(&j);

    assert!(scores["customer_support"] > 0);
    assert!(scores["support_roles"] > 0);
    assert!(matcher.is_relevant(&j));
}

#[test]
fn compliance_roles_match() {
    let matcher = SmartMatcher::default();
    for title in ["AML Analyst", "KYC Analyst", "Fraud Analyst", "Compliance Officer"] {
        assert!(matcher.is_relevant(&job(title, "FinCo")), "{title}");
    }
}

#[test]
fn component_words_only_from_allow_list() {
    let matcher = SmartMatcher::default();

    // "analyst" alone must not match: it is a component of many phrases
    // but not on the allow-list.
    assert!(!matcher.is_relevant(&job("Business Analyst", "AnyCo")));

    // "onboarding" is allow-listed, so it matches standalone.
    assert!(matcher.is_relevant(&job("Onboarding Lead", "AnyCo")));
}

#[test]
fn description_contributes_to_matching() {
    let matcher = SmartMatcher::default();
    let mut j = job("Team Member", "AnyCo");
    assert!(!matcher.is_relevant(&j));

    j.description = "You will handle customer support tickets and escalations.".to_string();
    assert!(matcher.is_relevant(&j));
}

#[test]
fn matching_is_word_bounded() {
    let matcher = SmartMatcher::default();
    // "supportive" must not match the "support" keyword.
    assert!(!matcher.is_relevant(&job("Supportive Care Nurse", "MedCo")));
}

#[test]
fn filter_preserves_order() {
    let matcher = SmartMatcher::default();
    let jobs = vec![
        job("Customer Support Agent", "A"),
        job("Software Engineer", "B"),
        job("Operations Analyst", "C"),
    ];
    let kept = matcher.filter(jobs);
    let titles: Vec<&str> = kept.iter().map(|j| j.title.as_str()).collect();
    assert_eq!(titles, vec!["Customer Support Agent", "Operations Analyst"]);
}

#[test]
fn min_score_threshold_applies() {
    let strict = SmartMatcher::new(jobscout::default_taxonomy(), 3);
    // Only one pattern matches; below the threshold of three.
    assert!(!strict.is_relevant(&job("Onboarding Lead", "AnyCo")));
    // Title hits several support patterns at once.
    assert!(strict.is_relevant(&job("Customer Support Specialist", "AnyCo")));
}
