// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt::Write;

use crate::chain::Chain;

impl Chain {
    /// Render the assembled graph in Graphviz DOT.
    ///
    /// Steps are boxes labelled with their id; edges are labelled with the
    /// short names of the items flowing along them. Steps with no upstream
    /// share the leftmost rank and the remaining steps with no downstream
    /// the rightmost.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph buildchain {\n    rankdir=LR;\n    node [shape=box];\n");

        for step in self.steps() {
            let _ = writeln!(
                out,
                "    \"{}\" [tooltip=\"{}\"];",
                escape(step.id()),
                escape(&step.provenance().location())
            );
        }

        for (from, to, items) in self.edges() {
            let (Some(from), Some(to)) = (self.step(from), self.step(to)) else {
                continue;
            };
            let label = items
                .iter()
                .map(|item| escape(item.short_name()))
                .collect::<Vec<_>>()
                .join("\\n");
            let _ = writeln!(
                out,
                "    \"{}\" -> \"{}\" [label=\"{}\"];",
                escape(from.id()),
                escape(to.id()),
                label
            );
        }

        let starts: Vec<&str> = self
            .steps()
            .iter()
            .filter(|step| step.upstream().is_empty())
            .map(|step| step.id())
            .collect();
        let ends: Vec<&str> = self
            .steps()
            .iter()
            .filter(|step| step.downstream().is_empty() && !step.upstream().is_empty())
            .map(|step| step.id())
            .collect();
        write_rank(&mut out, &starts);
        write_rank(&mut out, &ends);

        out.push_str("}\n");
        out
    }
}

fn write_rank(out: &mut String, ids: &[&str]) {
    if ids.is_empty() {
        return;
    }
    out.push_str("    { rank=same;");
    for id in ids {
        let _ = write!(out, " \"{}\";", escape(id));
    }
    out.push_str(" }\n");
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
