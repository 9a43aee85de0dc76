use herald_core::{DispatchReport, Outcome};

/// Subscription ids and outcomes of `report`, in registration order.
pub fn outcomes_of<R>(report: &DispatchReport<R>) -> Vec<(String, Outcome)> {
    report
        .outcomes()
        .map(|(id, outcome)| (id.to_string(), outcome))
        .collect()
}

/// Asserts that `report` holds exactly `expected`, in order.
#[track_caller]
pub fn assert_outcomes<R>(report: &DispatchReport<R>, expected: &[(&str, Outcome)]) {
    let expected: Vec<(String, Outcome)> = expected
        .iter()
        .map(|(id, outcome)| (id.to_string(), *outcome))
        .collect();
    assert_eq!(
        outcomes_of(report),
        expected,
        "unexpected outcomes for {} dispatch of {}",
        report.event_name(),
        report.context_type()
    );
}
