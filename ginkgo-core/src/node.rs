//! Spec Tree Nodes
//!
//! A [`ContainerNode`] is one `describe`/`context` level. It owns its child
//! containers, its leaf [`SubjectNode`]s and three ordered hook lists.
//! Containers and subjects are shuffled before a run; hooks never are.

use crate::{BenchmarkBody, Body, CodeLocation, Example};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Inclusion tag on containers and subjects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    /// Runs normally
    #[default]
    None,
    /// Focused: when anything is focused, only focused examples run
    Focused,
    /// Declared but not run
    Pending,
}

/// Setup or teardown callable attached to a container
#[derive(Debug, Clone)]
pub struct HookNode {
    /// Hook logic
    pub body: Body,
    /// Declaration site
    pub location: CodeLocation,
    /// Timeout for async bodies
    pub timeout: Duration,
}

impl HookNode {
    /// Create a hook node
    pub fn new(body: Body, location: CodeLocation, timeout: Duration) -> Self {
        Self {
            body,
            location,
            timeout,
        }
    }
}

/// A plain spec (`it`)
#[derive(Debug, Clone)]
pub struct SpecNode {
    /// Spec description
    pub text: String,
    /// Spec logic
    pub body: Body,
    /// Inclusion tag
    pub flag: Flag,
    /// Declaration site
    pub location: CodeLocation,
    /// Timeout for async bodies
    pub timeout: Duration,
}

/// A benchmark, sampled `sample_count` times
#[derive(Clone)]
pub struct BenchmarkNode {
    /// Benchmark description
    pub text: String,
    /// Sampled logic
    pub body: BenchmarkBody,
    /// Inclusion tag
    pub flag: Flag,
    /// Declaration site
    pub location: CodeLocation,
    /// Timeout recorded at declaration.
    ///
    /// Benchmark bodies are synchronous and hooks carry their own timeouts,
    /// so nothing is bounded by this value during a run.
    pub timeout: Duration,
    /// Number of samples to take
    pub sample_count: usize,
    /// Upper bound on the mean sample runtime; zero disables the check
    pub maximum_duration: Duration,
}

impl fmt::Debug for BenchmarkNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkNode")
            .field("text", &self.text)
            .field("flag", &self.flag)
            .field("location", &self.location)
            .field("timeout", &self.timeout)
            .field("sample_count", &self.sample_count)
            .field("maximum_duration", &self.maximum_duration)
            .finish_non_exhaustive()
    }
}

/// Leaf unit of declared work
#[derive(Debug, Clone)]
pub enum SubjectNode {
    /// `it`
    Spec(SpecNode),
    /// `benchmark`
    Benchmark(BenchmarkNode),
}

impl SubjectNode {
    /// Description text
    pub fn text(&self) -> &str {
        match self {
            SubjectNode::Spec(node) => &node.text,
            SubjectNode::Benchmark(node) => &node.text,
        }
    }

    /// Inclusion tag
    pub fn flag(&self) -> Flag {
        match self {
            SubjectNode::Spec(node) => node.flag,
            SubjectNode::Benchmark(node) => node.flag,
        }
    }

    /// Declaration site
    pub fn location(&self) -> &CodeLocation {
        match self {
            SubjectNode::Spec(node) => &node.location,
            SubjectNode::Benchmark(node) => &node.location,
        }
    }

    /// Whether this is a benchmark
    pub fn is_benchmark(&self) -> bool {
        matches!(self, SubjectNode::Benchmark(_))
    }
}

/// One nesting level of the spec tree
#[derive(Debug, Clone)]
pub struct ContainerNode {
    /// Container description
    pub text: String,
    /// Inclusion tag
    pub flag: Flag,
    /// Declaration site
    pub location: CodeLocation,
    children: Vec<ContainerNode>,
    subjects: Vec<SubjectNode>,
    before_each: Vec<HookNode>,
    just_before_each: Vec<HookNode>,
    after_each: Vec<HookNode>,
}

impl ContainerNode {
    /// Create an empty container
    pub fn new(text: impl Into<String>, flag: Flag, location: CodeLocation) -> Self {
        Self {
            text: text.into(),
            flag,
            location,
            children: Vec::new(),
            subjects: Vec::new(),
            before_each: Vec::new(),
            just_before_each: Vec::new(),
            after_each: Vec::new(),
        }
    }

    /// Append a child container, returning its index
    pub fn push_container_node(&mut self, container: ContainerNode) -> usize {
        self.children.push(container);
        self.children.len() - 1
    }

    /// Append a leaf
    pub fn push_subject_node(&mut self, subject: SubjectNode) {
        self.subjects.push(subject);
    }

    /// Append a before-each hook
    pub fn push_before_each_node(&mut self, hook: HookNode) {
        self.before_each.push(hook);
    }

    /// Append a just-before-each hook
    pub fn push_just_before_each_node(&mut self, hook: HookNode) {
        self.just_before_each.push(hook);
    }

    /// Append an after-each hook
    pub fn push_after_each_node(&mut self, hook: HookNode) {
        self.after_each.push(hook);
    }

    /// Child containers in current order
    pub fn children(&self) -> &[ContainerNode] {
        &self.children
    }

    /// Child container by index
    pub fn child_mut(&mut self, index: usize) -> Option<&mut ContainerNode> {
        self.children.get_mut(index)
    }

    /// Subjects in current order
    pub fn subjects(&self) -> &[SubjectNode] {
        &self.subjects
    }

    /// Before-each hooks in declaration order
    pub fn before_each(&self) -> &[HookNode] {
        &self.before_each
    }

    /// Just-before-each hooks in declaration order
    pub fn just_before_each(&self) -> &[HookNode] {
        &self.just_before_each
    }

    /// After-each hooks in declaration order
    pub fn after_each(&self) -> &[HookNode] {
        &self.after_each
    }

    /// Permute children and subjects at every level.
    ///
    /// Draw order is fixed (children, then subjects, then each child in its
    /// new position), so a given seed and tree shape always yield the same
    /// ordering.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.children.shuffle(rng);
        self.subjects.shuffle(rng);
        for child in &mut self.children {
            child.shuffle(rng);
        }
    }

    /// Flatten the tree below this container into examples.
    ///
    /// A container's own subjects come before its child containers'
    /// examples. The receiver's hooks apply to every example but its text is
    /// not part of the examples' container path.
    pub fn generate_examples(&self) -> Vec<Example> {
        let mut examples = Vec::new();
        let mut chain = Vec::new();
        self.collect_examples(&mut chain, &mut examples);
        examples
    }

    fn collect_examples<'a>(&'a self, chain: &mut Vec<&'a ContainerNode>, out: &mut Vec<Example>) {
        chain.push(self);
        for subject in &self.subjects {
            out.push(Example::compose(chain, subject));
        }
        for child in &self.children {
            child.collect_examples(chain, out);
        }
        chain.pop();
    }

    /// Total number of subjects in this subtree
    pub fn subject_count(&self) -> usize {
        self.subjects.len()
            + self
                .children
                .iter()
                .map(ContainerNode::subject_count)
                .sum::<usize>()
    }
}
