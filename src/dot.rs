//! Graphviz rendering of diagrams.
//!
//! Terminals sit at the bottom, decision nodes are ranked by variable, roots are
//! drawn as boxes on top. High edges are solid, low edges dashed, and
//! complemented edges end in a hollow circle.
//!
//! ```
//! use petri_reach::bdd::Bdd;
//!
//! let bdd = Bdd::default();
//! let f = bdd.cube([1, -2]);
//! let dot = bdd.to_dot_labelled(&[f], &Default::default(), |v| format!("p{}", v)).unwrap();
//! assert!(dot.starts_with("graph {"));
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::bdd::Bdd;
use crate::reference::Ref;

#[derive(Debug, Clone)]
pub struct DotConfig {
    pub node_shape: &'static str,
    pub terminal_shape: &'static str,
    pub root_shape: &'static str,
    pub high_edge_style: &'static str,
    pub low_edge_style: &'static str,
    pub negated_edge_style: &'static str,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "circle",
            terminal_shape: "square",
            root_shape: "rect",
            high_edge_style: "solid",
            low_edge_style: "dashed",
            negated_edge_style: "dotted",
        }
    }
}

impl Bdd {
    /// Render `roots`, labelling each decision node with `label(variable)`.
    pub fn to_dot_labelled(
        &self,
        roots: &[Ref],
        config: &DotConfig,
        label: impl Fn(u32) -> String,
    ) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "graph {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        writeln!(dot, "{{ rank=sink")?;
        writeln!(dot, "0 [shape={}, label=\"0\"];", config.terminal_shape)?;
        writeln!(dot, "1 [shape={}, label=\"1\"];", config.terminal_shape)?;
        writeln!(dot, "}}")?;

        let all_nodes = self.descendants(roots.iter().copied());
        let mut levels = BTreeMap::<u32, Vec<u32>>::new();
        for &id in all_nodes.iter() {
            if id == self.one.index() {
                continue;
            }
            levels.entry(self.variable(id)).or_default().push(id);
        }

        for (&var, ids) in levels.iter_mut() {
            ids.sort_unstable();
            let text = escape(&label(var));
            writeln!(dot, "{{ rank=same")?;
            for &id in ids.iter() {
                writeln!(dot, "{} [label=\"{}\"];", id, text)?;
            }
            writeln!(dot, "}}")?;
        }

        for ids in levels.values() {
            for &id in ids {
                let high = self.high(id);
                assert!(!high.is_negated(), "high edges are never complemented");
                writeln!(dot, "{} -- {} [style={}];", id, high.index(), config.high_edge_style)?;

                let low = self.low(id);
                if low == self.zero {
                    writeln!(dot, "{} -- 0 [style={}];", id, config.low_edge_style)?;
                } else if low.is_negated() {
                    writeln!(
                        dot,
                        "{} -- {} [style={}, dir=forward, arrowhead=odot];",
                        id,
                        low.index(),
                        config.negated_edge_style
                    )?;
                } else {
                    writeln!(dot, "{} -- {} [style={}];", id, low.index(), config.low_edge_style)?;
                }
            }
        }

        writeln!(dot, "{{ rank=source")?;
        for (i, root) in roots.iter().enumerate() {
            writeln!(dot, "r{} [shape={}, label=\"{}\"];", i, config.root_shape, root)?;
        }
        writeln!(dot, "}}")?;

        for (i, &root) in roots.iter().enumerate() {
            if root == self.zero {
                writeln!(dot, "r{} -- 0;", i)?;
            } else if root.is_negated() {
                writeln!(dot, "r{} -- {} [dir=forward, arrowhead=odot];", i, root.index())?;
            } else {
                writeln!(dot, "r{} -- {};", i, root.index())?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn render(bdd: &Bdd, roots: &[Ref]) -> String {
        bdd.to_dot_labelled(roots, &DotConfig::default(), |v| format!("x{}", v)).unwrap()
    }

    #[test]
    fn test_to_dot_basic() {
        let bdd = Bdd::default();
        let f = bdd.cube([-1, 2, 3]);

        let dot = render(&bdd, &[f]);
        assert!(dot.starts_with("graph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("label=\"x2\""));
    }

    #[test]
    fn test_to_dot_constants() {
        let bdd = Bdd::default();

        let dot = render(&bdd, &[bdd.zero, bdd.one]);
        assert!(dot.contains("r0 -- 0;"));
        assert!(dot.contains("r1 -- 1;"));
    }

    #[test]
    fn test_to_dot_labelled() {
        let bdd = Bdd::default();
        let f = bdd.apply_or(bdd.mk_var(1), bdd.mk_var(2));

        let names = ["fork \"left\"", "fork right"];
        let dot = bdd
            .to_dot_labelled(&[f], &DotConfig::default(), |v| names[v as usize - 1].to_string())
            .unwrap();
        assert!(dot.contains("label=\"fork \\\"left\\\"\""));
        assert!(dot.contains("label=\"fork right\""));
        assert!(!dot.contains("x1"));
    }

    #[test]
    fn test_to_dot_negated_root() {
        let bdd = Bdd::default();
        let f = -bdd.apply_and(bdd.mk_var(1), bdd.mk_var(2));

        let dot = render(&bdd, &[f]);
        assert!(dot.contains(&format!("r0 -- {} [dir=forward, arrowhead=odot];", f.index())));
    }
}
