//! Content-model automata.
//!
//! Each complex type's content particle is compiled into a nondeterministic
//! automaton whose edges consume one child element. Validation keeps the set
//! of live states per open element and advances it as children start.

use isoxsd_schema::{ElementDecl, MaxOccurs, Particle, Wildcard};
use std::collections::BTreeSet;
use tracing::warn;

/// Largest automaton built for one content model. Occurrence bounds are
/// expanded exactly while the model stays below it.
const STATE_BUDGET: u64 = 1 << 20;

/// Terminal consumed by an automaton edge.
#[derive(Debug, Clone)]
pub(crate) enum Term {
    Element(ElementDecl),
    Any(Wildcard),
}

impl Term {
    /// Returns a short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Element(decl) => format!("'{}'", decl.name),
            Self::Any(wildcard) => format!("any element in '{}'", wildcard.namespace),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct State {
    epsilon: Vec<usize>,
    edges: Vec<(usize, usize)>,
}

/// Child names and bounds of one `all` group.
#[derive(Debug, Clone)]
pub(crate) struct AllGroup {
    pub members: Vec<(String, u64, MaxOccurs)>,
}

/// Compiled content model of one complex type.
#[derive(Debug, Clone)]
pub(crate) struct ContentModel {
    states: Vec<State>,
    terms: Vec<Term>,
    accept: usize,
    all_groups: Vec<AllGroup>,
}

impl ContentModel {
    /// Compiles a content particle. `None` is the empty content model.
    pub fn compile(particle: Option<&Particle>) -> Self {
        let mut model = Self {
            states: vec![State::default()],
            terms: Vec::new(),
            accept: 0,
            all_groups: Vec::new(),
        };
        if let Some(particle) = particle {
            model.accept = model.repeated(particle, 0);
        }
        model
    }

    /// Returns the initial live-state set.
    pub fn start(&self) -> Vec<usize> {
        self.closure([0])
    }

    /// Returns true if the live states accept the children seen so far.
    pub fn accepts(&self, states: &[usize]) -> bool {
        states.contains(&self.accept)
    }

    /// Returns the `all` groups whose member counts are checked at the end.
    pub fn all_groups(&self) -> &[AllGroup] {
        &self.all_groups
    }

    /// Advances the live states over one child element.
    ///
    /// # Returns
    /// The next live states and the matched term, or None if no edge accepts
    /// the child. Element declarations take precedence over wildcards.
    pub fn step(&self, states: &[usize], accepts: impl Fn(&Term) -> bool) -> Option<(Vec<usize>, &Term)> {
        let mut element_targets = Vec::new();
        let mut wildcard_targets = Vec::new();
        let mut element_term = None;
        let mut wildcard_term = None;

        for &state in states {
            for &(term_index, target) in &self.states[state].edges {
                let term = &self.terms[term_index];
                if !accepts(term) {
                    continue;
                }
                match term {
                    Term::Element(_) => {
                        element_targets.push(target);
                        element_term.get_or_insert(term);
                    }
                    Term::Any(_) => {
                        wildcard_targets.push(target);
                        wildcard_term.get_or_insert(term);
                    }
                }
            }
        }

        match (element_term, wildcard_term) {
            (Some(term), _) => Some((self.closure(element_targets), term)),
            (None, Some(term)) => Some((self.closure(wildcard_targets), term)),
            (None, None) => None,
        }
    }

    /// Describes the children that could come next.
    pub fn expected(&self, states: &[usize]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut expected = Vec::new();
        for &state in states {
            for &(term_index, _) in &self.states[state].edges {
                if seen.insert(term_index) {
                    expected.push(self.terms[term_index].describe());
                }
            }
        }
        expected
    }

    fn closure(&self, seeds: impl IntoIterator<Item = usize>) -> Vec<usize> {
        let mut visited = BTreeSet::new();
        let mut pending: Vec<usize> = seeds.into_iter().collect();
        while let Some(state) = pending.pop() {
            if visited.insert(state) {
                pending.extend(self.states[state].epsilon.iter().copied());
            }
        }
        visited.into_iter().collect()
    }

    fn new_state(&mut self) -> usize {
        self.states.push(State::default());
        self.states.len() - 1
    }

    fn epsilon(&mut self, from: usize, to: usize) {
        self.states[from].epsilon.push(to);
    }

    /// Adds the particle with its occurrence bounds after `from`; returns the
    /// state reached once it is complete.
    fn repeated(&mut self, particle: &Particle, from: usize) -> usize {
        let occurs = particle.occurs();
        let fits = (self.states.len() as u64).saturating_add(weight(particle)) <= STATE_BUDGET;
        let (min, max) = if fits {
            (occurs.min, occurs.max)
        } else {
            warn!(
                particle = particle.kind(),
                min = occurs.min,
                max = %occurs.max,
                "Occurrence bounds too large to expand, treating the maximum as unbounded"
            );
            (occurs.min.min(1), MaxOccurs::Unbounded)
        };

        let mut current = from;
        for _ in 0..min {
            current = self.once(particle, current);
        }

        match max {
            MaxOccurs::Bounded(max) => {
                let end = self.new_state();
                self.epsilon(current, end);
                for _ in min..max {
                    current = self.once(particle, current);
                    self.epsilon(current, end);
                }
                end
            }
            MaxOccurs::Unbounded => {
                let loop_start = self.new_state();
                self.epsilon(current, loop_start);
                let body_end = self.once(particle, loop_start);
                self.epsilon(body_end, loop_start);
                loop_start
            }
        }
    }

    /// Adds exactly one occurrence of the particle after `from`.
    fn once(&mut self, particle: &Particle, from: usize) -> usize {
        match particle {
            Particle::Element(decl) => self.edge(from, Term::Element(decl.clone())),
            Particle::Any(wildcard) => self.edge(from, Term::Any(wildcard.clone())),
            Particle::Sequence(group) => group
                .particles
                .iter()
                .fold(from, |current, nested| self.repeated(nested, current)),
            Particle::Choice(group) => {
                let end = self.new_state();
                for nested in &group.particles {
                    let branch = self.new_state();
                    self.epsilon(from, branch);
                    let branch_end = self.repeated(nested, branch);
                    self.epsilon(branch_end, end);
                }
                end
            }
            Particle::All(group) => {
                let members = group
                    .particles
                    .iter()
                    .filter_map(|nested| match nested {
                        Particle::Element(decl) => {
                            Some((decl.name.clone(), decl.occurs.min, decl.occurs.max))
                        }
                        _ => None,
                    })
                    .collect();
                self.all_groups.push(AllGroup { members });

                let hub = self.new_state();
                self.epsilon(from, hub);
                for nested in &group.particles {
                    if let Particle::Element(decl) = nested {
                        let target = self.edge(hub, Term::Element(decl.clone()));
                        self.epsilon(target, hub);
                    }
                }
                hub
            }
        }
    }

    fn edge(&mut self, from: usize, term: Term) -> usize {
        let to = self.new_state();
        self.terms.push(term);
        let term_index = self.terms.len() - 1;
        self.states[from].edges.push((term_index, to));
        to
    }
}

/// Upper estimate of the states `repeated` adds for `particle`.
fn weight(particle: &Particle) -> u64 {
    let body = match particle {
        Particle::Element(_) | Particle::Any(_) => 1,
        Particle::Sequence(group) => group
            .particles
            .iter()
            .map(weight)
            .fold(0, u64::saturating_add),
        Particle::Choice(group) => group
            .particles
            .iter()
            .map(|nested| weight(nested).saturating_add(1))
            .fold(1, u64::saturating_add),
        Particle::All(group) => (group.particles.len() as u64).saturating_add(1),
    };
    let occurs = particle.occurs();
    let copies = match occurs.max {
        MaxOccurs::Bounded(max) => max.max(occurs.min),
        MaxOccurs::Unbounded => occurs.min.saturating_add(1),
    };
    body.saturating_mul(copies.max(1)).saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoxsd_schema::{BuiltinType, ModelGroup, Occurs, Schema, SimpleType, TypeDef};

    fn element(name: &str, min: u64, max: MaxOccurs) -> Particle {
        let mut schema = Schema::new(None);
        let string = schema.add_type(TypeDef::Simple(SimpleType::builtin(BuiltinType::String)));
        let mut decl = ElementDecl::new(name.to_string(), string);
        decl.occurs = Occurs::new(min, max);
        Particle::Element(decl)
    }

    fn run(model: &ContentModel, children: &[&str]) -> bool {
        let mut states = model.start();
        for child in children {
            let step = model.step(&states, |term| match term {
                Term::Element(decl) => decl.name == *child,
                Term::Any(_) => child.starts_with("x:"),
            });
            match step {
                Some((next, _)) => states = next,
                None => return false,
            }
        }
        model.accepts(&states)
    }

    #[test]
    fn test_sequence_with_occurs() {
        let particle = Particle::Sequence(ModelGroup::new(vec![
            element("A", 1, MaxOccurs::Bounded(1)),
            element("B", 0, MaxOccurs::Unbounded),
            element("C", 0, MaxOccurs::Bounded(2)),
        ]));
        let model = ContentModel::compile(Some(&particle));

        assert!(run(&model, &["A"]));
        assert!(run(&model, &["A", "B", "B", "B", "C"]));
        assert!(run(&model, &["A", "C", "C"]));
        assert!(!run(&model, &["A", "C", "C", "C"]));
        assert!(!run(&model, &["B"]));
        assert!(!run(&model, &["A", "C", "B"]));
        assert!(!run(&model, &[]));
    }

    #[test]
    fn test_large_bounds_are_exact() {
        let particle = Particle::Sequence(ModelGroup::new(vec![element(
            "I",
            120,
            MaxOccurs::Bounded(150),
        )]));
        let model = ContentModel::compile(Some(&particle));

        assert!(!run(&model, &["I"; 119]));
        assert!(run(&model, &["I"; 120]));
        assert!(run(&model, &["I"; 150]));
        assert!(!run(&model, &["I"; 151]));
    }

    #[test]
    fn test_repeated_group_bounds() {
        let mut group = ModelGroup::new(vec![
            element("A", 1, MaxOccurs::Bounded(1)),
            element("B", 0, MaxOccurs::Bounded(1)),
        ]);
        group.occurs = Occurs::new(0, MaxOccurs::Bounded(101));
        let model = ContentModel::compile(Some(&Particle::Sequence(group)));

        let mut children = Vec::new();
        for _ in 0..101 {
            children.extend(["A", "B"]);
        }
        assert!(run(&model, &children));
        children.push("A");
        assert!(!run(&model, &children));
    }

    #[test]
    fn test_choice() {
        let particle = Particle::Choice(ModelGroup::new(vec![
            element("A", 1, MaxOccurs::Bounded(1)),
            element("B", 1, MaxOccurs::Bounded(1)),
        ]));
        let model = ContentModel::compile(Some(&particle));

        assert!(run(&model, &["A"]));
        assert!(run(&model, &["B"]));
        assert!(!run(&model, &["A", "B"]));
        assert_eq!(model.expected(&model.start()), vec!["'A'", "'B'"]);
    }

    #[test]
    fn test_repeated_choice_and_wildcard() {
        let mut group = ModelGroup::new(vec![
            element("A", 1, MaxOccurs::Bounded(1)),
            Particle::Any(Wildcard {
                namespace: "##other".to_string(),
                process_contents: Default::default(),
                occurs: Occurs::ONCE,
            }),
        ]);
        group.occurs = Occurs::new(1, MaxOccurs::Unbounded);
        let model = ContentModel::compile(Some(&Particle::Choice(group)));

        assert!(run(&model, &["A", "x:Foo", "A"]));
        assert!(!run(&model, &["Foo"]));
    }

    #[test]
    fn test_all_group() {
        let particle = Particle::All(ModelGroup::new(vec![
            element("A", 1, MaxOccurs::Bounded(1)),
            element("B", 0, MaxOccurs::Bounded(1)),
        ]));
        let model = ContentModel::compile(Some(&particle));

        assert!(run(&model, &["B", "A"]));
        assert_eq!(model.all_groups().len(), 1);
        assert_eq!(model.all_groups()[0].members[0].0, "A");
    }

    #[test]
    fn test_empty_content() {
        let model = ContentModel::compile(None);
        assert!(run(&model, &[]));
        assert!(!run(&model, &["A"]));
    }
}
