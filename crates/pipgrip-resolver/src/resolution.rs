use std::fmt::{Display, Formatter};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use pipgrip_interpreter::PipReport;
use pipgrip_normalize::{ExtraName, PackageName};
use pipgrip_pep440::Version;
use pipgrip_pep508::Requirement;

/// A package at the version pip would install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPackage {
    pub name: PackageName,
    pub version: Version,
    /// The extras that ended up active, from the requirements on this package.
    pub extras: Vec<ExtraName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A package from the installation report.
    Package(ResolvedPackage),
    /// A top-level requirement pip failed to report on, kept so that it still shows up in the
    /// output.
    Skipped(Requirement),
}

impl Node {
    pub fn name(&self) -> &PackageName {
        match self {
            Self::Package(package) => &package.name,
            Self::Skipped(requirement) => &requirement.name,
        }
    }

    /// The resolved version, or the pinned version of a skipped `name==version` requirement.
    pub fn version(&self) -> Option<&Version> {
        match self {
            Self::Package(package) => Some(&package.version),
            Self::Skipped(requirement) => requirement.exact_version(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// `name==version`, or the requirement itself for a skipped requirement without a pin.
impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self, self.version()) {
            (_, Some(version)) => write!(f, "{}=={}", self.name(), version),
            (Self::Skipped(requirement), None) => write!(f, "{requirement}"),
            (Self::Package(package), None) => write!(f, "{}", package.name),
        }
    }
}

/// A top-level requirement that was skipped, with the reason.
#[derive(Debug)]
pub struct SkippedRequirement {
    pub requirement: Requirement,
    pub error: pipgrip_interpreter::Error,
}

/// The dependency graph of an installation report.
///
/// Every node is a package (or a skipped requirement), every edge points from a package to one
/// of its dependencies and carries the requirement that pulled the dependency in.
#[derive(Debug, Default)]
pub struct Resolution {
    graph: DiGraph<Node, Requirement>,
    roots: Vec<(Requirement, NodeIndex)>,
    skipped: Vec<SkippedRequirement>,
}

impl Resolution {
    /// Build the graph for the top-level `requirements` from the report pip wrote for them.
    ///
    /// `Requires-Dist` entries are evaluated against the environment pip reported. Extras are
    /// propagated until nothing changes, since enabling an extra on one package can enable
    /// extras on its dependencies.
    pub fn from_report(
        requirements: &[Requirement],
        report: Option<&PipReport>,
        skipped: Vec<SkippedRequirement>,
    ) -> Self {
        let mut graph = DiGraph::new();

        let positions: FxHashMap<&PackageName, usize> = report
            .map(|report| {
                report
                    .install
                    .iter()
                    .enumerate()
                    .map(|(position, install)| (&install.metadata.name, position))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(report) = report {
            let mut active: Vec<Vec<ExtraName>> = report
                .install
                .iter()
                .map(|install| install.requested_extras.clone())
                .collect();
            for requirement in requirements {
                if let Some(&position) = positions.get(&requirement.name) {
                    for extra in &requirement.extras {
                        if !active[position].contains(extra) {
                            active[position].push(extra.clone());
                        }
                    }
                }
            }

            // Propagate extras to a fixpoint.
            let mut queue: Vec<usize> = (0..report.install.len()).collect();
            while let Some(position) = queue.pop() {
                let install = &report.install[position];
                let mut enabled = Vec::new();
                for dependency in &install.metadata.requires_dist {
                    if !dependency.evaluate_markers(&report.environment, &active[position]) {
                        continue;
                    }
                    let Some(&target) = positions.get(&dependency.name) else {
                        continue;
                    };
                    for extra in &dependency.extras {
                        enabled.push((target, extra.clone()));
                    }
                }
                for (target, extra) in enabled {
                    if !active[target].contains(&extra) {
                        trace!(
                            "Enabling extra `{extra}` of {}",
                            report.install[target].metadata.name
                        );
                        active[target].push(extra);
                        queue.push(target);
                    }
                }
            }

            for (install, extras) in report.install.iter().zip(&active) {
                graph.add_node(Node::Package(ResolvedPackage {
                    name: install.metadata.name.clone(),
                    version: install.metadata.version.clone(),
                    extras: extras.clone(),
                }));
            }

            for (position, install) in report.install.iter().enumerate() {
                let mut seen = FxHashSet::default();
                for dependency in &install.metadata.requires_dist {
                    if !dependency.evaluate_markers(&report.environment, &active[position]) {
                        continue;
                    }
                    let Some(&target) = positions.get(&dependency.name) else {
                        trace!(
                            "`{dependency}` of {} is not part of the report",
                            install.metadata.name
                        );
                        continue;
                    };
                    // The first requirement on a dependency labels the edge.
                    if seen.insert(target) {
                        graph.add_edge(
                            NodeIndex::new(position),
                            NodeIndex::new(target),
                            dependency.without_markers(),
                        );
                    }
                }
            }
        }

        let mut roots: Vec<(Requirement, NodeIndex)> = Vec::new();
        for requirement in requirements {
            if roots.iter().any(|(root, _)| root.name == requirement.name) {
                continue;
            }
            let is_skipped = skipped.iter().any(|skip| skip.requirement == *requirement);
            if let Some(&position) = positions.get(&requirement.name) {
                // A skipped requirement on a package that is resolved anyway, as a dependency
                // of another requirement, shares the resolved node.
                if is_skipped {
                    debug!("`{requirement}` was skipped, but {} is resolved", requirement.name);
                }
                roots.push((requirement.clone(), NodeIndex::new(position)));
            } else if is_skipped {
                let index = graph.add_node(Node::Skipped(requirement.clone()));
                roots.push((requirement.clone(), index));
            } else {
                debug!("`{requirement}` is not part of the report, its markers don't apply");
            }
        }

        Self {
            graph,
            roots,
            skipped,
        }
    }

    /// The top-level requirements and their nodes, in input order.
    pub fn roots(&self) -> impl Iterator<Item = (&Requirement, NodeIndex)> {
        self.roots.iter().map(|(requirement, index)| (requirement, *index))
    }

    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.graph[index]
    }

    /// The direct dependencies of a node, in `Requires-Dist` order.
    pub fn dependencies(&self, index: NodeIndex) -> Vec<(&Requirement, NodeIndex)> {
        self.neighbors(index, Direction::Outgoing)
    }

    /// The nodes depending on a node, with the requirement they have on it.
    pub fn dependents(&self, index: NodeIndex) -> Vec<(&Requirement, NodeIndex)> {
        self.neighbors(index, Direction::Incoming)
    }

    fn neighbors(&self, index: NodeIndex, direction: Direction) -> Vec<(&Requirement, NodeIndex)> {
        // petgraph iterates edges newest first; edge indices follow insertion order.
        let mut edges: Vec<_> = self.graph.edges_directed(index, direction).collect();
        edges.sort_unstable_by_key(|edge| edge.id());
        edges
            .into_iter()
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (edge.weight(), other)
            })
            .collect()
    }

    /// Every node reachable from the roots, once, in depth-first pre-order.
    pub fn flatten(&self) -> Vec<NodeIndex> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        for (_, root) in &self.roots {
            let mut stack = vec![*root];
            while let Some(index) = stack.pop() {
                if !seen.insert(index) {
                    continue;
                }
                order.push(index);
                // Reversed, so that the first dependency is visited first.
                stack.extend(
                    self.dependencies(index)
                        .into_iter()
                        .rev()
                        .map(|(_, dependency)| dependency),
                );
            }
        }
        order
    }

    /// The requirements that were skipped because pip failed to report on them.
    pub fn skipped(&self) -> &[SkippedRequirement] {
        &self.skipped
    }

    /// Return `true` if there are no top-level requirements in this resolution.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
