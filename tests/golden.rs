//! Golden tests for discrete Bayesian networks.
//!
//! These tests pin structure handling, table layout and the estimators on
//! small hand-checked networks.

use discrete_bayesnet::{
    ConditionalTable, Dataset, Dimension, DiscreteBayesianNetwork, Edge, FitConfig, FitError,
    GraphError, NetworkError, NetworkFitter, NodeId, NormalizationRule, TableError,
    UnobservedPolicy,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

const SURVEY_MODEL: &str = "A, S, E|A:S, O|E, R|E, T|O:R";

const SURVEY_DATA: &str = "\
A,S,E,O,R,T
adult,F,high,emp,big,car
adult,M,high,emp,big,other
adult,F,uni,emp,big,train
young,M,high,emp,small,car
old,F,uni,self,big,car
adult,M,high,emp,big,car
young,F,uni,emp,big,train
old,M,high,self,small,other
adult,M,uni,emp,big,car
young,M,high,emp,big,car
";

fn survey_network() -> DiscreteBayesianNetwork {
    let mut network = DiscreteBayesianNetwork::from_model_string(SURVEY_MODEL).unwrap();
    network
        .set_levels_many(vec![
            ("A", vec!["young", "adult", "old"]),
            ("S", vec!["M", "F"]),
            ("E", vec!["high", "uni"]),
            ("O", vec!["emp", "self"]),
            ("R", vec!["small", "big"]),
            ("T", vec!["car", "train", "other"]),
        ])
        .unwrap();
    network
}

fn survey_rows() -> Vec<Vec<String>> {
    Dataset::parse_delimited(SURVEY_DATA, ',').rows().to_vec()
}

fn ids(members: Vec<&NodeId>) -> Vec<&str> {
    members.into_iter().map(NodeId::as_str).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Structure
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn model_string_builds_nodes_and_arcs() {
    let network = DiscreteBayesianNetwork::from_model_string("A, S, E|A:S").unwrap();

    let names: Vec<_> = network.variables().map(|(id, _)| id.as_str()).collect();
    assert_eq!(names, vec!["A", "S", "E"]);
    assert_eq!(network.arcs(), vec![Edge::new("A", "E"), Edge::new("S", "E")]);
    assert_eq!(ids(network.markov_blanket("E").unwrap()), vec!["A", "S"]);
}

#[test]
fn cyclic_arc_is_rejected_and_arcs_unchanged() {
    let mut network = DiscreteBayesianNetwork::from_model_string("A, S, E|A:S").unwrap();
    let before = network.arcs();
    let generation = network.graph().generation();

    let err = network.add_arc("E", "A").unwrap_err();
    assert_eq!(
        err,
        NetworkError::Graph(GraphError::CyclicGraph { from: NodeId::from("E"), to: NodeId::from("A") })
    );
    assert_eq!(network.arcs(), before);
    assert_eq!(network.graph().generation(), generation);
    assert!(network.graph().is_acyclic());
}

#[test]
fn survey_structure() {
    let network = survey_network();

    assert_eq!(network.len(), 6);
    assert_eq!(network.arcs().len(), 6);
    assert_eq!(ids(network.markov_blanket("E").unwrap()), vec!["A", "O", "R", "S"]);
    assert_eq!(ids(network.markov_blanket("O").unwrap()), vec!["E", "R", "T"]);
    assert_eq!(ids(network.markov_blanket("T").unwrap()), vec!["O", "R"]);

    // Blanket sizes A:2 S:2 E:4 O:3 R:3 T:2
    assert!((network.average_markov_blanket_size() - 16.0 / 6.0).abs() < 1e-12);
    assert!((network.average_branching_factor() - 1.0).abs() < 1e-12);
}

#[test]
fn structure_hash_tracks_arcs() {
    let a = survey_network();
    let b = survey_network();
    assert_eq!(a.graph().structure_hash(), b.graph().structure_hash());

    let mut c = survey_network();
    c.remove_arc("R", "T").unwrap();
    assert_ne!(a.graph().structure_hash(), c.graph().structure_hash());
}

// ─────────────────────────────────────────────────────────────────────────────
// Tables
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn table_counts_then_mle() {
    let table = ConditionalTable::build(vec![
        Dimension::new("A", ["young", "adult", "old"]),
        Dimension::new("S", ["M", "F"]),
        Dimension::new("E", ["high", "uni"]),
    ])
    .unwrap();
    assert_eq!(table.shape(), vec![3, 2, 2]);
    assert_eq!(table.len(), 12);

    let mut table = table;
    table.increment(&["young", "M", "high"]).unwrap();
    assert_eq!(table.count(&["young", "M", "high"]).unwrap(), 1);
    assert_eq!(table.count(&["young", "M", "uni"]).unwrap(), 0);

    let rule = NormalizationRule::MaximumLikelihood { unobserved: UnobservedPolicy::Uniform };
    let table = table.normalize(&rule).unwrap();
    assert_eq!(table.probability(&["young", "M", "high"]).unwrap(), 1.0);
    assert_eq!(table.probability(&["young", "M", "uni"]).unwrap(), 0.0);
    assert!(matches!(
        table.count(&["young", "M", "high"]),
        Err(TableError::NotCounting(_))
    ));
}

#[test]
fn rebuild_shapes_follows_structure() {
    let mut network = survey_network();
    NetworkFitter::rebuild_shapes(&mut network).unwrap();
    assert_eq!(network.table("T").unwrap().shape(), vec![2, 2, 3]);

    network.add_arc("A", "T").unwrap();
    assert!(network.table("T").is_none());

    NetworkFitter::rebuild_shapes(&mut network).unwrap();
    assert_eq!(network.table("T").unwrap().shape(), vec![3, 2, 2, 3]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Fitting
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn mle_fit_on_survey() {
    let mut network = survey_network();
    let report = network.fit(&survey_rows(), &FitConfig::mle()).unwrap();

    assert_eq!(report.rows_counted, 10);
    assert!(network.is_fitted());

    // S: M=6, F=4
    assert_eq!(network.table("S").unwrap().distribution::<&str>(&[]).unwrap(), &[0.6, 0.4]);
    // O | E=uni: emp=3, self=1
    assert_eq!(network.table("O").unwrap().distribution(&["uni"]).unwrap(), &[0.75, 0.25]);
    // E | young,F: uni once
    assert_eq!(network.table("E").unwrap().distribution(&["young", "F"]).unwrap(), &[0.0, 1.0]);
}

#[test]
fn bayes_with_zero_iss_equals_mle() {
    let rows = survey_rows();

    let mut mle = survey_network();
    mle.fit(&rows, &FitConfig::mle()).unwrap();
    let mut bayes = survey_network();
    bayes.fit(&rows, &FitConfig::bayes(0.0)).unwrap();

    for (id, variable) in mle.variables() {
        assert_eq!(variable.table(), bayes.table(id.as_str()), "variable {id}");
    }
}

#[test]
fn bayes_rows_sum_to_one() {
    let mut network = survey_network();
    network.fit(&survey_rows(), &FitConfig::bayes(10.0)).unwrap();

    for (id, variable) in network.variables() {
        let table = variable.table().unwrap();
        for block in 0..table.num_configurations() {
            let labels = table.configuration_labels(block);
            let sum: f64 = table.distribution(&labels).unwrap().iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "{id} {labels:?} sums to {sum}");
        }
    }
}

#[test]
fn reject_policy_names_unobserved_configuration() {
    let mut network = survey_network();
    let config = FitConfig::mle().with_unobserved(UnobservedPolicy::Reject);

    // Header and three adults: E | young,M is never observed.
    let rows = survey_rows();
    let err = network.fit(&rows[..4], &config).unwrap_err();
    assert!(matches!(err, FitError::Table(TableError::UnobservedConfiguration { .. })));
    assert!(!network.is_fitted());
}

#[test]
fn params_hash_is_stable() {
    assert_eq!(FitConfig::bayes(10.0).params_hash(), FitConfig::bayes(10.0).params_hash());
    assert_ne!(FitConfig::bayes(10.0).params_hash(), FitConfig::bayes(20.0).params_hash());
    assert_ne!(FitConfig::mle().params_hash(), FitConfig::bayes(10.0).params_hash());
}
