//! Flattened Examples
//!
//! An [`Example`] is one subject node together with the hooks it inherits
//! from every ancestor container, ready to run.

use crate::{CodeLocation, ContainerNode, Flag, HookNode, SubjectNode};

/// Text, flag and location of one ancestor container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Container description
    pub text: String,
    /// Inclusion tag
    pub flag: Flag,
    /// Declaration site
    pub location: CodeLocation,
}

/// A fully-resolved runnable unit
#[derive(Debug, Clone)]
pub struct Example {
    /// Ancestor containers, outermost first (the top-level container excluded)
    pub containers: Vec<ContainerInfo>,
    /// The leaf being run
    pub subject: SubjectNode,
    /// Before-each hooks, root to leaf
    pub before_each: Vec<HookNode>,
    /// Just-before-each hooks, root to leaf
    pub just_before_each: Vec<HookNode>,
    /// After-each hooks, leaf to root
    pub after_each: Vec<HookNode>,
}

impl Example {
    /// Compose an example from its container chain (outermost first)
    pub(crate) fn compose(chain: &[&ContainerNode], subject: &SubjectNode) -> Self {
        let containers = chain
            .iter()
            .skip(1)
            .map(|c| ContainerInfo {
                text: c.text.clone(),
                flag: c.flag,
                location: c.location.clone(),
            })
            .collect();

        Self {
            containers,
            subject: subject.clone(),
            before_each: chain
                .iter()
                .flat_map(|c| c.before_each().iter().cloned())
                .collect(),
            just_before_each: chain
                .iter()
                .flat_map(|c| c.just_before_each().iter().cloned())
                .collect(),
            after_each: chain
                .iter()
                .rev()
                .flat_map(|c| c.after_each().iter().cloned())
                .collect(),
        }
    }

    /// Subject text
    pub fn text(&self) -> &str {
        self.subject.text()
    }

    /// Container texts followed by the subject text
    pub fn component_texts(&self) -> Vec<String> {
        self.containers
            .iter()
            .map(|c| c.text.clone())
            .chain(std::iter::once(self.subject.text().to_string()))
            .collect()
    }

    /// Container locations followed by the subject location
    pub fn component_locations(&self) -> Vec<CodeLocation> {
        self.containers
            .iter()
            .map(|c| c.location.clone())
            .chain(std::iter::once(self.subject.location().clone()))
            .collect()
    }

    /// Space-joined component texts, used for focus and skip matching
    pub fn full_text(&self) -> String {
        self.component_texts().join(" ")
    }

    /// Effective flag: pending if the subject or any ancestor is pending,
    /// otherwise focused if any of them is focused
    pub fn flag(&self) -> Flag {
        let flags = || {
            self.containers
                .iter()
                .map(|c| c.flag)
                .chain(std::iter::once(self.subject.flag()))
        };
        if flags().any(|f| f == Flag::Pending) {
            Flag::Pending
        } else if flags().any(|f| f == Flag::Focused) {
            Flag::Focused
        } else {
            Flag::None
        }
    }

    /// Whether the subject is a benchmark
    pub fn is_benchmark(&self) -> bool {
        self.subject.is_benchmark()
    }

    /// Subject declaration site
    pub fn location(&self) -> &CodeLocation {
        self.subject.location()
    }
}
