use std::fmt::Write;

use anyhow::Result;
use itertools::Itertools;
use petgraph::graph::NodeIndex;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use pipgrip_pep508::Requirement;
use pipgrip_resolver::{Node, Resolution};

use crate::settings::{OutputFormat, OutputSettings, TreeSettings, TreeStyle};

/// Render a resolution in the requested output format.
///
/// The output ends with a newline, unless there is nothing to show in a text format.
pub(crate) fn render(resolution: &Resolution, settings: OutputSettings) -> Result<String> {
    let mut out = String::new();
    match settings.format {
        OutputFormat::Flat => {
            for node in pins(resolution, settings.sort) {
                writeln!(out, "{node}")?;
            }
        }
        OutputFormat::Pipe => {
            let pins = pins(resolution, settings.sort);
            if !pins.is_empty() {
                writeln!(out, "{}", pins.iter().join(" "))?;
            }
        }
        OutputFormat::Json => {
            let pins = FlatJson(pins(resolution, settings.sort));
            writeln!(out, "{}", serde_json::to_string(&pins)?)?;
        }
        OutputFormat::Tree(tree_settings) => {
            let entries = tree(resolution, tree_settings, settings.sort);
            if tree_settings.json {
                let entries = entries
                    .iter()
                    .map(|entry| JsonEntry::new(resolution, entry, tree_settings.reversed))
                    .collect::<Vec<_>>();
                writeln!(out, "{}", serde_json::to_string(&entries)?)?;
            } else {
                let guides = Guides::from(tree_settings.style);
                for entry in &entries {
                    writeln!(out, "{}", label(resolution, entry, tree_settings.reversed))?;
                    write_children(
                        &mut out,
                        resolution,
                        &entry.children,
                        "",
                        guides,
                        tree_settings.reversed,
                    )?;
                }
            }
        }
    }
    Ok(out)
}

/// Every package once, depth-first from the top-level requirements.
pub(crate) fn pins(resolution: &Resolution, sort: bool) -> Vec<&Node> {
    let mut nodes = resolution
        .flatten()
        .into_iter()
        .map(|index| resolution.node(index))
        .collect::<Vec<_>>();
    if sort {
        nodes.sort_by(|a, b| a.name().cmp(b.name()));
    }
    nodes
}

/// `{"name": "version", ...}` in output order; the version of a skipped requirement without a
/// pin is `null`.
struct FlatJson<'a>(Vec<&'a Node>);

impl Serialize for FlatJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for node in &self.0 {
            map.serialize_entry(
                node.name().as_ref(),
                &node.version().map(ToString::to_string),
            )?;
        }
        map.end()
    }
}

/// A node of the rendered tree.
#[derive(Debug)]
struct Entry<'a> {
    index: NodeIndex,
    /// The requirement that led to this node, absent for the leaves of a reversed tree.
    requirement: Option<&'a Requirement>,
    /// The node is already on the path from the top level; its children are not shown again.
    cyclic: bool,
    children: Vec<Entry<'a>>,
}

fn tree(resolution: &Resolution, settings: TreeSettings, sort: bool) -> Vec<Entry<'_>> {
    let top: Vec<(Option<&Requirement>, NodeIndex)> = if settings.reversed {
        resolution
            .flatten()
            .into_iter()
            .filter(|index| resolution.dependencies(*index).is_empty())
            .map(|index| (None, index))
            .collect()
    } else {
        resolution
            .roots()
            .map(|(requirement, index)| (Some(requirement), index))
            .collect()
    };

    let mut path = Vec::new();
    let mut entries = top
        .into_iter()
        .map(|(requirement, index)| entry(resolution, index, requirement, settings, sort, &mut path))
        .collect::<Vec<_>>();
    if sort {
        sort_entries(resolution, &mut entries);
    }
    entries
}

fn entry<'a>(
    resolution: &'a Resolution,
    index: NodeIndex,
    requirement: Option<&'a Requirement>,
    settings: TreeSettings,
    sort: bool,
    path: &mut Vec<NodeIndex>,
) -> Entry<'a> {
    let cyclic = path.contains(&index);
    let expand = !cyclic
        && settings
            .max_depth
            .is_none_or(|max_depth| path.len() + 1 < max_depth);

    let mut children = Vec::new();
    if expand {
        let neighbors = if settings.reversed {
            resolution.dependents(index)
        } else {
            resolution.dependencies(index)
        };
        path.push(index);
        children = neighbors
            .into_iter()
            .map(|(requirement, child)| {
                entry(resolution, child, Some(requirement), settings, sort, path)
            })
            .collect();
        path.pop();
        if sort {
            sort_entries(resolution, &mut children);
        }
    }

    Entry {
        index,
        requirement,
        cyclic,
        children,
    }
}

fn sort_entries(resolution: &Resolution, entries: &mut [Entry<'_>]) {
    entries.sort_by(|a, b| {
        resolution
            .node(a.index)
            .name()
            .cmp(resolution.node(b.index).name())
    });
}

#[derive(Debug, Clone, Copy)]
struct Guides {
    branch: &'static str,
    last: &'static str,
    pipe: &'static str,
    blank: &'static str,
}

impl From<TreeStyle> for Guides {
    fn from(style: TreeStyle) -> Self {
        match style {
            TreeStyle::Unicode => Self {
                branch: "├── ",
                last: "└── ",
                pipe: "│   ",
                blank: "    ",
            },
            TreeStyle::Ascii => Self {
                branch: "|-- ",
                last: "+-- ",
                pipe: "|   ",
                blank: "    ",
            },
        }
    }
}

fn write_children(
    out: &mut String,
    resolution: &Resolution,
    children: &[Entry<'_>],
    prefix: &str,
    guides: Guides,
    reversed: bool,
) -> std::fmt::Result {
    for (position, child) in children.iter().enumerate() {
        let (branch, continuation) = if position + 1 == children.len() {
            (guides.last, guides.blank)
        } else {
            (guides.branch, guides.pipe)
        };
        writeln!(out, "{prefix}{branch}{}", label(resolution, child, reversed))?;
        write_children(
            out,
            resolution,
            &child.children,
            &format!("{prefix}{continuation}"),
            guides,
            reversed,
        )?;
    }
    Ok(())
}

/// A line of a text tree.
///
/// Top-down, every line is the requirement with the version it resolved to, e.g.
/// `idna<2.9,>=2.5 (2.8)`. Bottom-up, every line is the package, followed by the requirement
/// the dependent package has, e.g. `requests==2.22.0 [requires: idna<2.9,>=2.5]`.
fn label(resolution: &Resolution, entry: &Entry<'_>, reversed: bool) -> String {
    let node = resolution.node(entry.index);
    if reversed {
        let mut label = node.to_string();
        if node.is_skipped() {
            label.push_str(" (skipped)");
        }
        if let Some(requirement) = entry.requirement {
            label.push_str(&format!(" [requires: {requirement}]"));
        }
        if entry.cyclic {
            label.push_str(" (cyclic)");
        }
        label
    } else {
        let requirement = entry
            .requirement
            .map_or_else(|| node.to_string(), ToString::to_string);
        let mut details = match node {
            Node::Package(package) => package.version.to_string(),
            Node::Skipped(_) => "skipped".to_string(),
        };
        if entry.cyclic {
            details.push_str(", cyclic");
        }
        format!("{requirement} ({details})")
    }
}

/// A tree JSON record, `dependencies` (or `dependents` in a reversed tree) are omitted when empty.
#[derive(Debug, Serialize)]
struct JsonEntry {
    name: String,
    version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<JsonEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dependents: Vec<JsonEntry>,
}

impl JsonEntry {
    fn new(resolution: &Resolution, entry: &Entry<'_>, reversed: bool) -> Self {
        let node = resolution.node(entry.index);
        let children = entry
            .children
            .iter()
            .map(|child| Self::new(resolution, child, reversed))
            .collect();
        let (dependencies, dependents) = if reversed {
            (Vec::new(), children)
        } else {
            (children, Vec::new())
        };
        Self {
            name: node.name().to_string(),
            version: node.version().map(ToString::to_string),
            dependencies,
            dependents,
        }
    }
}

#[cfg(test)]
mod tests;
