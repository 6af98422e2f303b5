//! NFA (Nondeterministic Finite Automaton) construction
//!
//! This module implements Thompson's construction to build an NFA from the
//! regex IR. The order of the transitions leaving a state encodes priority:
//! the matcher always tries them first to last, which is what makes greedy
//! and lazy quantifiers and ordered alternation behave like a backtracking
//! regex engine.
//!
//! Counted repetitions are not unrolled. They compile into one `Repeat`
//! transition over a sub-automaton, so `{0,9999}` costs as much as `{0,3}`.

use crate::ast::{CharacterClass, Expr, Quantifier};

/// An NFA state ID
pub type StateId = usize;

/// A transition in the NFA
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Transition on a specific character
    Char(char),
    /// Transition matching a character class
    CharClass(CharacterClass),
    /// Epsilon transition (no input consumed)
    Epsilon,
    /// Start of a capture slot
    GroupStart(usize),
    /// End of a capture slot
    GroupEnd(usize),
    /// Start of input anchor
    StartAnchor,
    /// End of input anchor
    EndAnchor,
    /// Zero-width assertion running the sub-automaton `index`
    Lookahead {
        /// Index into [`Nfa::subs`]
        index: usize,
        /// Whether the assertion succeeds when the sub-automaton fails
        negated: bool,
    },
    /// Between `min` and `max` iterations of the sub-automaton `index`.
    /// Each iteration commits to the first match of the sub-automaton.
    Repeat {
        /// Index into [`Nfa::subs`]
        index: usize,
        min: u32,
        max: u32,
        greedy: bool,
    },
}

/// An NFA state
#[derive(Debug, Clone)]
pub struct State {
    /// Transitions from this state, in priority order
    pub transitions: Vec<(Transition, StateId)>,
    /// Whether this is an accepting state
    pub is_accepting: bool,
}

impl State {
    fn new() -> Self {
        State {
            transitions: Vec::new(),
            is_accepting: false,
        }
    }
}

/// An NFA (Nondeterministic Finite Automaton)
#[derive(Debug, Clone)]
pub struct Nfa {
    /// All states in the NFA
    pub states: Vec<State>,
    /// The start state
    pub start: StateId,
    /// The accepting state
    pub accept: StateId,
    /// Sub-automata of lookahead assertions and counted repetitions
    pub subs: Vec<Nfa>,
    /// Number of capture slots
    pub slots: usize,
}

impl Nfa {
    /// Create a new empty NFA
    pub fn new() -> Self {
        Nfa {
            states: Vec::new(),
            start: 0,
            accept: 0,
            subs: Vec::new(),
            slots: 0,
        }
    }

    /// Allocate a new state and return its ID
    fn new_state(&mut self) -> StateId {
        self.states.push(State::new());
        self.states.len() - 1
    }

    /// Add a transition between states
    fn add_transition(&mut self, from: StateId, transition: Transition, to: StateId) {
        self.states[from].transitions.push((transition, to));
    }

    /// Build an NFA from an IR expression
    pub fn from_expr(expr: &Expr) -> Self {
        let mut nfa = Nfa::new();
        nfa.slots = expr.slot_count();
        let (start, accept) = nfa.compile_expr(expr);
        nfa.start = start;
        nfa.accept = accept;
        nfa.states[accept].is_accepting = true;
        nfa
    }

    /// Whether the automaton can only match at the start of the input
    pub fn is_anchored(&self) -> bool {
        let mut state = self.start;
        loop {
            match self.states[state].transitions.as_slice() {
                [(Transition::StartAnchor, _)] => return true,
                [(Transition::Epsilon, next)] => state = *next,
                _ => return false,
            }
        }
    }

    /// Compile an expression and return (start, accept) state IDs
    fn compile_expr(&mut self, expr: &Expr) -> (StateId, StateId) {
        match expr {
            Expr::Empty => self.compile_empty(),
            Expr::Literal(c) => self.compile_single(Transition::Char(*c)),
            Expr::Sequence(exprs) => self.compile_sequence(exprs),
            Expr::Alternation(exprs) => self.compile_alternation(exprs),
            Expr::CharacterClass(cc) => self.compile_single(Transition::CharClass(cc.clone())),
            Expr::Quantified { expr, quantifier } => self.compile_quantified(expr, *quantifier),
            Expr::NonCapturingGroup(expr) => self.compile_expr(expr),
            Expr::Capture { slot, expr } => self.compile_capture(*slot, expr),
            Expr::StartAnchor => self.compile_single(Transition::StartAnchor),
            Expr::EndAnchor => self.compile_single(Transition::EndAnchor),
            Expr::Lookahead(expr) => self.compile_lookahead(expr, false),
            Expr::NegativeLookahead(expr) => self.compile_lookahead(expr, true),
        }
    }

    /// Compile an empty expression
    fn compile_empty(&mut self) -> (StateId, StateId) {
        self.compile_single(Transition::Epsilon)
    }

    /// Compile a single transition between two fresh states
    fn compile_single(&mut self, transition: Transition) -> (StateId, StateId) {
        let start = self.new_state();
        let accept = self.new_state();
        self.add_transition(start, transition, accept);
        (start, accept)
    }

    /// Compile a sequence
    fn compile_sequence(&mut self, exprs: &[Expr]) -> (StateId, StateId) {
        let Some((first, rest)) = exprs.split_first() else {
            return self.compile_empty();
        };

        let (start, mut prev_accept) = self.compile_expr(first);
        for expr in rest {
            let (s, a) = self.compile_expr(expr);
            self.add_transition(prev_accept, Transition::Epsilon, s);
            prev_accept = a;
        }

        (start, prev_accept)
    }

    /// Compile alternation (a|b|c)
    fn compile_alternation(&mut self, exprs: &[Expr]) -> (StateId, StateId) {
        if exprs.is_empty() {
            return self.compile_empty();
        }
        if exprs.len() == 1 {
            return self.compile_expr(&exprs[0]);
        }

        let start = self.new_state();
        let accept = self.new_state();

        for expr in exprs {
            let (s, a) = self.compile_expr(expr);
            self.add_transition(start, Transition::Epsilon, s);
            self.add_transition(a, Transition::Epsilon, accept);
        }

        (start, accept)
    }

    /// Compile a quantified expression
    fn compile_quantified(&mut self, expr: &Expr, quantifier: Quantifier) -> (StateId, StateId) {
        match quantifier {
            Quantifier::Exactly(n) => return self.compile_counted(expr, n, n, true),
            Quantifier::Between(n, m) => return self.compile_counted(expr, n, m, true),
            Quantifier::BetweenLazy(n, m) => return self.compile_counted(expr, n, m, false),
            _ => {}
        }

        let (inner_start, inner_accept) = self.compile_expr(expr);
        let start = self.new_state();
        let accept = self.new_state();

        match quantifier {
            Quantifier::ZeroOrMore => {
                // *: Greedy - prefer to match more
                self.add_transition(start, Transition::Epsilon, inner_start);
                self.add_transition(start, Transition::Epsilon, accept);
                self.add_transition(inner_accept, Transition::Epsilon, inner_start);
                self.add_transition(inner_accept, Transition::Epsilon, accept);
            }
            Quantifier::ZeroOrMoreLazy => {
                // *?: Lazy - prefer to match less (exit first)
                self.add_transition(start, Transition::Epsilon, accept);
                self.add_transition(start, Transition::Epsilon, inner_start);
                self.add_transition(inner_accept, Transition::Epsilon, accept);
                self.add_transition(inner_accept, Transition::Epsilon, inner_start);
            }
            Quantifier::OneOrMore => {
                self.add_transition(start, Transition::Epsilon, inner_start);
                self.add_transition(inner_accept, Transition::Epsilon, inner_start);
                self.add_transition(inner_accept, Transition::Epsilon, accept);
            }
            Quantifier::OneOrMoreLazy => {
                self.add_transition(start, Transition::Epsilon, inner_start);
                self.add_transition(inner_accept, Transition::Epsilon, accept);
                self.add_transition(inner_accept, Transition::Epsilon, inner_start);
            }
            Quantifier::Optional => {
                self.add_transition(start, Transition::Epsilon, inner_start);
                self.add_transition(start, Transition::Epsilon, accept);
                self.add_transition(inner_accept, Transition::Epsilon, accept);
            }
            Quantifier::Exactly(_) | Quantifier::Between(..) | Quantifier::BetweenLazy(..) => {
                unreachable!("counted repetitions are compiled above")
            }
        }

        (start, accept)
    }

    /// Compile repeat between `min` and `max` times as one transition
    fn compile_counted(
        &mut self,
        expr: &Expr,
        min: u32,
        max: u32,
        greedy: bool,
    ) -> (StateId, StateId) {
        let index = self.subs.len();
        self.subs.push(Nfa::from_expr(expr));
        self.compile_single(Transition::Repeat {
            index,
            min,
            max: max.max(min),
            greedy,
        })
    }

    /// Compile a capture into `slot`
    fn compile_capture(&mut self, slot: usize, expr: &Expr) -> (StateId, StateId) {
        let start = self.new_state();
        let (inner_start, inner_accept) = self.compile_expr(expr);
        let accept = self.new_state();

        self.add_transition(start, Transition::GroupStart(slot), inner_start);
        self.add_transition(inner_accept, Transition::GroupEnd(slot), accept);

        (start, accept)
    }

    /// Compile a lookahead assertion into its own sub-automaton
    fn compile_lookahead(&mut self, expr: &Expr, negated: bool) -> (StateId, StateId) {
        let index = self.subs.len();
        self.subs.push(Nfa::from_expr(expr));
        self.compile_single(Transition::Lookahead { index, negated })
    }
}

impl Default for Nfa {
    fn default() -> Self {
        Self::new()
    }
}
