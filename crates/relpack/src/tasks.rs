use anyhow::{Context, Result, anyhow};
use log::info;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use crate::config::Config;

type TaskFn = fn(&Config) -> Result<()>;

struct Task {
    name: &'static str,
    run: TaskFn,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("name", &self.name).finish()
    }
}

/// An explicit directed task graph with declared prerequisites.
///
/// Running a task executes its prerequisite closure in topological order,
/// prerequisites first, short-circuiting on the first failure. Registration
/// order carries no meaning; only the declared edges do.
#[derive(Debug, Default)]
pub struct TaskGraph {
    graph: DiGraph<Task, ()>,
    indices: FxHashMap<&'static str, NodeIndex>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&mut self, name: &'static str, run: TaskFn) {
        let index = self.graph.add_node(Task { name, run });
        self.indices.insert(name, index);
    }

    /// Declare that `task` requires `prerequisite` to have completed first.
    pub fn add_prerequisite(&mut self, task: &'static str, prerequisite: &'static str) -> Result<()> {
        let task_index = self.index_of(task)?;
        let prereq_index = self.index_of(prerequisite)?;
        // Edge points prerequisite -> dependent, so toposort yields
        // prerequisites first
        self.graph.add_edge(prereq_index, task_index, ());
        Ok(())
    }

    /// Execute `name` and everything it transitively requires.
    pub fn run(&self, name: &str, config: &Config) -> Result<()> {
        let target = self.index_of(name)?;
        let required = self.required_set(target);

        let sorted = toposort(&self.graph, None)
            .map_err(|cycle| anyhow!("Task cycle involving '{}'", self.graph[cycle.node_id()].name))?;

        for index in sorted {
            if !required.contains(&index) {
                continue;
            }
            let task = &self.graph[index];
            info!("Running task '{}'", task.name);
            (task.run)(config).with_context(|| format!("Task '{}' failed", task.name))?;
        }
        Ok(())
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex> {
        self.indices
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("Unknown task: {}", name))
    }

    /// The target plus its transitive prerequisites, via reverse DFS.
    fn required_set(&self, target: NodeIndex) -> Vec<NodeIndex> {
        let mut required = vec![target];
        let mut stack = vec![target];
        while let Some(index) = stack.pop() {
            for prereq in self
                .graph
                .neighbors_directed(index, petgraph::Direction::Incoming)
            {
                if !required.contains(&prereq) {
                    required.push(prereq);
                    stack.push(prereq);
                }
            }
        }
        required
    }
}
