//! GraphViz `.dot` export, for visualizing a diagram's structure.
//!
//! Mirrors `ipset_node_cache_save_dot`: one node per reachable
//! nonterminal plus the terminals it can reach, low edges dashed, high
//! edges solid.

use std::io::{self, Write};

use crate::cache::Cache;
use crate::nid::NodeId;

/// Write a GraphViz digraph of the diagram rooted at `root` to `writer`.
pub fn write<W: Write>(writer: &mut W, cache: &Cache, root: NodeId) -> io::Result<()> {
    writeln!(writer, "digraph ipset {{")?;
    writeln!(writer, "  rankdir=TB;")?;

    let mut seen_nonterminals = std::collections::HashSet::new();
    let mut seen_terminals = std::collections::HashSet::new();
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        if id.is_terminal() {
            if seen_terminals.insert(id.terminal_value()) {
                writeln!(
                    writer,
                    "  t{v} [shape=box, label=\"{v}\"];",
                    v = id.terminal_value()
                )?;
            }
            continue;
        }
        let index = id.index();
        if !seen_nonterminals.insert(index) {
            continue;
        }
        let node = cache.node(id);
        writeln!(writer, "  n{index} [label=\"x{}\"];", node.variable)?;

        let target = |n: NodeId| if n.is_terminal() { format!("t{}", n.terminal_value()) } else { format!("n{}", n.index()) };
        writeln!(writer, "  n{index} -> {} [style=dashed];", target(node.low))?;
        writeln!(writer, "  n{index} -> {} [style=solid];", target(node.high))?;

        stack.push(node.low);
        stack.push(node.high);
    }

    writeln!(writer, "}}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nid::{ONE, ZERO};

    #[test]
    fn single_variable_diagram_emits_one_node_and_two_terminals() {
        let mut cache = Cache::new();
        let f = cache.unique(0, ZERO, ONE);
        let mut buf = Vec::new();
        write(&mut buf, &cache, f).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("digraph ipset {"));
        assert!(text.contains("n0 [label=\"x0\"];"));
        assert!(text.contains("t0 [shape=box"));
        assert!(text.contains("t1 [shape=box"));
    }

    #[test]
    fn terminal_only_diagram_has_no_nonterminal_lines() {
        let cache = Cache::new();
        let mut buf = Vec::new();
        write(&mut buf, &cache, ZERO).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(!text.contains("-> "));
        assert!(text.contains("t0"));
    }
}
