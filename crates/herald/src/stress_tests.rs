//! Randomized subscribe / disconnect / dispatch sequences checked against a
//! plain model of the expected subscriber table.

use crate::{ContextType, Event, KeyStyle, Outcome, SequentialIds};

#[derive(Debug)]
struct Sensor;

#[derive(Debug)]
struct Reading(u32);

crate::context!(Sensor);
crate::context!(Reading: Sensor);

#[derive(Debug, Clone)]
struct Model {
    id: String,
    active: bool,
    listening: bool,
    fails: bool,
}

fn expected_outcome(model: &Model) -> Outcome {
    match (model.active, model.listening, model.fails) {
        (false, _, _) => Outcome::Closed,
        (true, false, _) => Outcome::NotListening,
        (true, true, true) => Outcome::Error,
        (true, true, false) => Outcome::Uncertain,
    }
}

#[test]
fn test_random_lifecycles_match_model() {
    for seed in 0..32 {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut event: Event<u32> = Event::builder("sensors")
            .context::<Sensor>()
            .context::<Reading>()
            .id_strategy(SequentialIds::new())
            .build()
            .unwrap();
        let mut model: Vec<Model> = Vec::new();
        let mut dispatched = 0;

        for _ in 0..200 {
            match rng.u8(0..6) {
                0 => {
                    let id = event.subscribe().unwrap().id().to_string();
                    model.push(Model {
                        id,
                        active: true,
                        listening: false,
                        fails: false,
                    });
                }
                1 if !model.is_empty() => {
                    let entry = rng.usize(0..model.len());
                    let fails = rng.bool();
                    let mut sub = event.subscription_mut(&model[entry].id).unwrap();
                    let outcome = sub
                        .listen(move |reading: &Reading| {
                            if fails {
                                anyhow::bail!("sensor offline");
                            }
                            Ok(reading.0 * 2)
                        })
                        .unwrap();
                    assert_eq!(outcome.accepted(), model[entry].active);
                    if model[entry].active {
                        model[entry].listening = true;
                        model[entry].fails = fails;
                    }
                }
                2 if !model.is_empty() => {
                    let entry = rng.usize(0..model.len());
                    event.disconnect(&model[entry].id);
                    model[entry].active = false;
                }
                3 if !model.is_empty() => {
                    let entry = rng.usize(0..model.len());
                    let removed = model.remove(entry);
                    assert!(event.unsubscribe(&removed.id));
                }
                4 => {
                    let purged = event.purge_inactive();
                    let before = model.len();
                    model.retain(|m| m.active);
                    assert_eq!(purged, before - model.len());
                }
                _ => {
                    let value = rng.u32(0..1000);
                    let report = event.dispatch(Reading(value)).unwrap();
                    dispatched += 1;

                    let outcomes: Vec<(String, Outcome)> =
                        report.outcomes().map(|(id, outcome)| (id.to_string(), outcome)).collect();
                    let expected: Vec<(String, Outcome)> =
                        model.iter().map(|m| (m.id.clone(), expected_outcome(m))).collect();
                    assert_eq!(outcomes, expected, "seed {seed}");

                    let delivered = model.iter().filter(|m| expected_outcome(m) == Outcome::Uncertain).count();
                    assert_eq!(report.listener_count(), delivered);
                    assert!(report.values().all(|(_, v)| *v == value * 2));

                    model.retain(|m| m.active);
                }
            }
            assert_eq!(event.count(), model.len(), "seed {seed}");
        }

        let stats = event.stats().unwrap();
        assert_eq!(stats.emits(ContextType::of::<Reading>()), dispatched);
        assert_eq!(stats.emits(ContextType::of::<Sensor>()), 0);

        let snapshot = event.inspect(KeyStyle::Short).unwrap();
        let current = &snapshot.current["Reading"];
        let listening: Vec<String> = model
            .iter()
            .filter(|m| m.active && m.listening)
            .map(|m| m.id.clone())
            .collect();
        assert_eq!(current, &listening);
    }
}
