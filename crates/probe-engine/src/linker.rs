//! Graph linker
//!
//! Turns a wire-format probe document into an execution plan: names are
//! checked for uniqueness, every property bag is parsed into its typed
//! struct, every input stream is resolved to its producing processor
//! (collector types are external feeds and need no producer), and the
//! processors are ordered topologically. Ties are broken by declaration
//! order so that repeated links of the same document yield the same
//! plan.

use crate::error::{LinkError, LinkResult};
use probe_model::{ProbeDocument, ProcessorType, TypedProperties};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use tracing::debug;

/// One processor of a linked plan, in execution order
#[derive(Debug, Clone)]
pub struct PlanStep {
    /// Position in the original document
    pub index: usize,
    pub name: String,
    pub processor_type: ProcessorType,
    pub properties: TypedProperties,
    /// Input role -> stream key
    pub inputs: BTreeMap<String, String>,
    /// Output role -> stream key
    pub outputs: BTreeMap<String, String>,
}

/// A validated, topologically ordered probe
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub label: String,
    pub steps: Vec<PlanStep>,
}

impl ExecutionPlan {
    pub fn step(&self, name: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Link `doc` into an execution plan
pub fn link(doc: &ProbeDocument) -> LinkResult<ExecutionPlan> {
    let mut seen = HashSet::new();
    for decl in &doc.processors {
        if !seen.insert(decl.name.as_str()) {
            return Err(LinkError::DuplicateProcessor {
                name: decl.name.clone(),
            });
        }
    }

    // Each stream key has exactly one producer.
    let mut producers: HashMap<&str, usize> = HashMap::new();
    for (index, decl) in doc.processors.iter().enumerate() {
        for stream in decl.outputs.values() {
            if let Some(&first) = producers.get(stream.as_str()) {
                return Err(LinkError::DuplicateStream {
                    stream: stream.clone(),
                    first: doc.processors[first].name.clone(),
                    second: decl.name.clone(),
                });
            }
            producers.insert(stream, index);
        }
    }

    let mut steps = Vec::with_capacity(doc.processors.len());
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); doc.processors.len()];
    let mut indegree = vec![0usize; doc.processors.len()];

    for (index, decl) in doc.processors.iter().enumerate() {
        let properties = TypedProperties::parse(decl)?;

        for (role, stream) in &decl.inputs {
            let Some(&producer) = producers.get(stream.as_str()) else {
                return Err(LinkError::UnresolvedStream {
                    processor: decl.name.clone(),
                    role: role.clone(),
                    stream: stream.clone(),
                });
            };
            dependents[producer].push(index);
            indegree[index] += 1;
        }

        steps.push(PlanStep {
            index,
            name: decl.name.clone(),
            processor_type: decl.processor_type,
            properties,
            inputs: decl.inputs.clone(),
            outputs: decl.outputs.clone(),
        });
    }

    // Stable Kahn: among ready processors, the earliest declaration runs
    // first.
    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(steps.len());
    while let Some(Reverse(index)) = ready.pop() {
        order.push(index);
        for &dependent in &dependents[index] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if order.len() < steps.len() {
        // Whatever Kahn could not order is the cycle plus everything
        // downstream of it. Peel off nodes that feed nothing else
        // unresolved until only the cycle participants remain.
        let mut unresolved: HashSet<usize> = indegree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d > 0)
            .map(|(i, _)| i)
            .collect();
        loop {
            let peeled: Vec<usize> = unresolved
                .iter()
                .filter(|&&i| !dependents[i].iter().any(|d| unresolved.contains(d)))
                .copied()
                .collect();
            if peeled.is_empty() {
                break;
            }
            for i in peeled {
                unresolved.remove(&i);
            }
        }
        let mut members: Vec<String> = unresolved
            .into_iter()
            .map(|i| doc.processors[i].name.clone())
            .collect();
        members.sort();
        return Err(LinkError::CyclicGraph { members });
    }

    let by_index: HashMap<usize, PlanStep> = steps.into_iter().map(|s| (s.index, s)).collect();
    let ordered = order
        .into_iter()
        .filter_map(|i| by_index.get(&i).cloned())
        .collect::<Vec<_>>();

    debug!(probe = %doc.label, steps = ordered.len(), "linked probe document");

    Ok(ExecutionPlan {
        label: doc.label.clone(),
        steps: ordered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe_model::{ProcessorDecl, ProcessorType};
    use serde_json::json;

    fn decl(
        name: &str,
        processor_type: ProcessorType,
        inputs: &[(&str, &str)],
        outputs: &[(&str, &str)],
        properties: serde_json::Value,
    ) -> ProcessorDecl {
        let mut decl = ProcessorDecl::new(name, processor_type);
        decl.inputs = inputs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        decl.outputs = outputs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        decl.properties = properties.as_object().cloned().unwrap_or_default();
        decl
    }

    fn collector(name: &str, stream: &str) -> ProcessorDecl {
        decl(
            name,
            ProcessorType::IfCounter,
            &[],
            &[("out", stream)],
            json!({"counter_type": "tx_bytes", "graph_query": "q"}),
        )
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let doc = ProbeDocument {
            label: "p".to_string(),
            processors: vec![
                decl(
                    "late consumer",
                    ProcessorType::Sum,
                    &[("in", "raw")],
                    &[("out", "s1")],
                    json!({"group_by": []}),
                ),
                collector("feed", "raw"),
                decl(
                    "other consumer",
                    ProcessorType::Sum,
                    &[("in", "raw")],
                    &[("out", "s2")],
                    json!({"group_by": []}),
                ),
            ],
        };

        let plan = link(&doc).unwrap();
        let names: Vec<&str> = plan.steps.iter().map(|s| s.name.as_str()).collect();
        // The feed must precede both consumers; the consumers keep their
        // declaration order.
        assert_eq!(names, vec!["feed", "late consumer", "other consumer"]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let doc = ProbeDocument {
            label: "p".to_string(),
            processors: vec![collector("feed", "a"), collector("feed", "b")],
        };
        assert!(matches!(
            link(&doc),
            Err(LinkError::DuplicateProcessor { name }) if name == "feed"
        ));
    }

    #[test]
    fn test_unresolved_stream_rejected() {
        let doc = ProbeDocument {
            label: "p".to_string(),
            processors: vec![decl(
                "consumer",
                ProcessorType::Sum,
                &[("in", "missing")],
                &[("out", "s")],
                json!({"group_by": []}),
            )],
        };
        match link(&doc) {
            Err(LinkError::UnresolvedStream {
                processor, stream, ..
            }) => {
                assert_eq!(processor, "consumer");
                assert_eq!(stream, "missing");
            }
            other => panic!("expected UnresolvedStream, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_rejected_naming_participants() {
        let doc = ProbeDocument {
            label: "p".to_string(),
            processors: vec![
                decl(
                    "a",
                    ProcessorType::Sum,
                    &[("in", "from_b")],
                    &[("out", "from_a")],
                    json!({"group_by": []}),
                ),
                decl(
                    "b",
                    ProcessorType::Sum,
                    &[("in", "from_a")],
                    &[("out", "from_b")],
                    json!({"group_by": []}),
                ),
                // Reads out of the cycle but is not part of it; it must
                // not be named in the error.
                decl(
                    "downstream",
                    ProcessorType::Sum,
                    &[("in", "from_a")],
                    &[("out", "from_downstream")],
                    json!({"group_by": []}),
                ),
            ],
        };
        match link(&doc) {
            Err(LinkError::CyclicGraph { members }) => {
                assert_eq!(members, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected CyclicGraph, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_stream_rejected() {
        let doc = ProbeDocument {
            label: "p".to_string(),
            processors: vec![collector("one", "raw"), collector("two", "raw")],
        };
        assert!(matches!(
            link(&doc),
            Err(LinkError::DuplicateStream { stream, .. }) if stream == "raw"
        ));
    }

    #[test]
    fn test_malformed_properties_rejected_at_link() {
        let doc = ProbeDocument {
            label: "p".to_string(),
            processors: vec![
                collector("feed", "raw"),
                decl(
                    "window",
                    ProcessorType::Accumulate,
                    &[("in", "raw")],
                    &[("out", "history")],
                    json!({"total_duration": "soon", "max_samples": 5}),
                ),
            ],
        };
        assert!(matches!(link(&doc), Err(LinkError::InvalidProperties(_))));
    }
}
