//! Regex matching engine
//!
//! A bounded backtracking matcher over the Thompson NFA. Transitions are
//! explored in priority order, so greedy/lazy quantifiers and alternation
//! resolve exactly like a Perl-style engine. Every `(state, position)` pair is
//! visited at most once per search, which keeps matching time linear in the
//! input for a given automaton, including the adversarial unnamed
//! multi-variable expressions that make classic backtracking explode.
//!
//! Lookaheads and counted repetitions run their sub-automata on backtrackers
//! that live as long as the search. Resetting one only clears the bitset
//! words it touched, so repeated sub-searches cost what they explore. A
//! counted repetition does up to `max` sub-searches at each position it is
//! tried from.

use crate::ast::Expr;
use crate::nfa::{Nfa, StateId, Transition};

/// A match result
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// The start position of the match (byte offset)
    pub start: usize,
    /// The end position of the match (byte offset, exclusive)
    pub end: usize,
    /// Capture slots, `None` when the slot did not participate
    pub groups: Vec<Option<(usize, usize)>>,
}

impl Match {
    /// Get the matched text
    pub fn as_str<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start..self.end]
    }

    /// Get a capture slot by index (0-based)
    pub fn group(&self, n: usize) -> Option<(usize, usize)> {
        self.groups.get(n).copied().flatten()
    }

    /// Get the text of a capture slot
    pub fn group_str<'a>(&self, input: &'a str, n: usize) -> Option<&'a str> {
        self.group(n).map(|(start, end)| &input[start..end])
    }
}

/// The regex engine
#[derive(Debug, Clone)]
pub struct Regex {
    nfa: Nfa,
    anchored: bool,
}

impl Regex {
    /// Compile an IR expression
    pub fn from_expr(expr: &Expr) -> Self {
        let nfa = Nfa::from_expr(expr);
        let anchored = nfa.is_anchored();
        Regex { nfa, anchored }
    }

    /// Number of capture slots
    pub fn slots(&self) -> usize {
        self.nfa.slots
    }

    /// Number of NFA states, sub-automata included
    pub fn state_count(&self) -> usize {
        fn count(nfa: &Nfa) -> usize {
            nfa.states.len() + nfa.subs.iter().map(count).sum::<usize>()
        }
        count(&self.nfa)
    }

    /// Check if the pattern matches anywhere in the input
    pub fn is_match(&self, input: &str) -> bool {
        self.find(input).is_some()
    }

    /// Find the leftmost match in the input
    pub fn find(&self, input: &str) -> Option<Match> {
        let haystack = Haystack::new(input);
        let mut backtracker = Backtracker::new(&self.nfa, &haystack);

        for start in 0..=haystack.len() {
            if let Some(end) = backtracker.run(start) {
                return Some(backtracker.to_match(start, end));
            }
            if self.anchored {
                break;
            }
        }
        None
    }

    /// Back-to-back matches: the first at the start of `input`, each next one
    /// where the previous ended. Stops at the end of the input, at the first
    /// position without a match, or after an empty match. A start anchor only
    /// holds for the first match.
    pub fn find_contiguous(&self, input: &str) -> Vec<Match> {
        let haystack = Haystack::new(input);
        let mut backtracker = Backtracker::new(&self.nfa, &haystack);
        let mut matches = Vec::new();
        let mut pos = 0;

        while pos < haystack.len() {
            backtracker.reset();
            let Some(end) = backtracker.run(pos) else {
                break;
            };
            matches.push(backtracker.to_match(pos, end));
            if end == pos {
                break;
            }
            pos = end;
        }
        matches
    }
}

/// The input split into characters, with byte offsets for slicing
struct Haystack {
    chars: Vec<char>,
    offsets: Vec<usize>,
}

impl Haystack {
    fn new(input: &str) -> Self {
        let (mut offsets, chars): (Vec<usize>, Vec<char>) = input.char_indices().unzip();
        offsets.push(input.len());
        Haystack { chars, offsets }
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    fn offset(&self, pos: usize) -> usize {
        self.offsets[pos]
    }
}

/// Work items of the explicit backtracking stack
enum Frame {
    /// Explore `state` at character position `pos`
    Explore(StateId, usize),
    /// Record `pos` into capture index `index`, then explore `target`
    Capture {
        index: usize,
        pos: usize,
        target: StateId,
    },
    /// Undo a capture when its branch failed
    Restore(usize, Option<usize>),
}

struct Backtracker<'a> {
    nfa: &'a Nfa,
    haystack: &'a Haystack,
    visited: Vec<u64>,
    /// Nonzero words of `visited`
    touched: Vec<usize>,
    caps: Vec<Option<usize>>,
    stack: Vec<Frame>,
    /// One backtracker per sub-automaton, created on first use
    subs: Vec<Option<Box<Backtracker<'a>>>>,
}

impl<'a> Backtracker<'a> {
    fn new(nfa: &'a Nfa, haystack: &'a Haystack) -> Self {
        let bits = nfa.states.len() * (haystack.len() + 1);
        Backtracker {
            nfa,
            haystack,
            visited: vec![0; bits.div_ceil(64)],
            touched: Vec::new(),
            caps: vec![None; nfa.slots * 2],
            stack: Vec::new(),
            subs: nfa.subs.iter().map(|_| None).collect(),
        }
    }

    /// Mark `(state, pos)` as visited, returning false if it already was
    fn mark(&mut self, state: StateId, pos: usize) -> bool {
        let bit = state * (self.haystack.len() + 1) + pos;
        let (word, mask) = (bit / 64, 1u64 << (bit % 64));
        let bits = self.visited[word];
        if bits & mask != 0 {
            return false;
        }
        if bits == 0 {
            self.touched.push(word);
        }
        self.visited[word] = bits | mask;
        true
    }

    /// Forget every visited pair
    fn reset(&mut self) {
        for word in self.touched.drain(..) {
            self.visited[word] = 0;
        }
    }

    /// Run the automaton anchored at `start` and return the end position of
    /// the highest-priority match. On success `caps` holds its captures.
    ///
    /// Visited pairs are kept between runs, which is only sound while every
    /// earlier run failed. Call [`Backtracker::reset`] after a success.
    fn run(&mut self, start: usize) -> Option<usize> {
        self.caps.iter_mut().for_each(|c| *c = None);
        self.stack.clear();
        self.stack.push(Frame::Explore(self.nfa.start, start));

        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Explore(state, pos) => {
                    if !self.mark(state, pos) {
                        continue;
                    }
                    if state == self.nfa.accept {
                        return Some(pos);
                    }
                    self.push_transitions(state, pos);
                }
                Frame::Capture { index, pos, target } => {
                    self.stack.push(Frame::Restore(index, self.caps[index]));
                    self.caps[index] = Some(pos);
                    self.stack.push(Frame::Explore(target, pos));
                }
                Frame::Restore(index, old) => {
                    self.caps[index] = old;
                }
            }
        }
        None
    }

    /// A fresh run from `start`
    fn first_end(&mut self, start: usize) -> Option<usize> {
        self.reset();
        self.run(start)
    }

    fn to_match(&self, start: usize, end: usize) -> Match {
        let haystack = self.haystack;
        Match {
            start: haystack.offset(start),
            end: haystack.offset(end),
            groups: self
                .caps
                .chunks(2)
                .map(|pair| match (pair[0], pair[1]) {
                    (Some(s), Some(e)) if s <= e => {
                        Some((haystack.offset(s), haystack.offset(e)))
                    }
                    _ => None,
                })
                .collect(),
        }
    }

    /// The backtracker of sub-automaton `index`
    fn sub(&mut self, index: usize) -> &mut Backtracker<'a> {
        let (nfa, haystack) = (self.nfa, self.haystack);
        self.subs[index]
            .get_or_insert_with(|| Box::new(Backtracker::new(&nfa.subs[index], haystack)))
    }

    /// Positions reached after 0, 1, 2... iterations of sub-automaton `index`
    /// from `pos`, at most `max` iterations
    fn repeat_ends(&mut self, index: usize, pos: usize, min: u32, max: u32) -> Vec<usize> {
        let sub = self.sub(index);
        let mut ends = vec![pos];
        let mut at = pos;
        while ends.len() <= max as usize {
            match sub.first_end(at) {
                Some(end) if end > at => {
                    ends.push(end);
                    at = end;
                }
                Some(_) => {
                    // an empty iteration repeats forever
                    while ends.len() <= min as usize {
                        ends.push(at);
                    }
                    break;
                }
                None => break,
            }
        }
        ends
    }

    /// Push the continuations of `state` so that the first transition is
    /// popped first.
    fn push_transitions(&mut self, state: StateId, pos: usize) {
        let nfa = self.nfa;
        for (transition, target) in nfa.states[state].transitions.iter().rev() {
            let target = *target;
            match transition {
                Transition::Epsilon => self.stack.push(Frame::Explore(target, pos)),
                Transition::Char(c) => {
                    if self.haystack.chars.get(pos) == Some(c) {
                        self.stack.push(Frame::Explore(target, pos + 1));
                    }
                }
                Transition::CharClass(class) => {
                    if let Some(&c) = self.haystack.chars.get(pos)
                        && class.matches(c)
                    {
                        self.stack.push(Frame::Explore(target, pos + 1));
                    }
                }
                Transition::GroupStart(slot) => self.stack.push(Frame::Capture {
                    index: slot * 2,
                    pos,
                    target,
                }),
                Transition::GroupEnd(slot) => self.stack.push(Frame::Capture {
                    index: slot * 2 + 1,
                    pos,
                    target,
                }),
                Transition::StartAnchor => {
                    if pos == 0 {
                        self.stack.push(Frame::Explore(target, pos));
                    }
                }
                Transition::EndAnchor => {
                    if pos == self.haystack.len() {
                        self.stack.push(Frame::Explore(target, pos));
                    }
                }
                Transition::Lookahead { index, negated } => {
                    let found = self.sub(*index).first_end(pos).is_some();
                    if found != *negated {
                        self.stack.push(Frame::Explore(target, pos));
                    }
                }
                Transition::Repeat {
                    index,
                    min,
                    max,
                    greedy,
                } => {
                    let ends = self.repeat_ends(*index, pos, *min, *max);
                    let viable = ends.get(*min as usize..).unwrap_or_default();
                    // the last pushed is tried first
                    if *greedy {
                        for &end in viable {
                            self.stack.push(Frame::Explore(target, end));
                        }
                    } else {
                        for &end in viable.iter().rev() {
                            self.stack.push(Frame::Explore(target, end));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ClassItem, Quantifier};

    fn lower() -> Expr {
        Expr::char_class(false, vec![ClassItem::Range('a', 'z')])
    }

    fn anchored(exprs: Vec<Expr>) -> Regex {
        let mut all = vec![Expr::start_anchor()];
        all.extend(exprs);
        all.push(Expr::end_anchor());
        Regex::from_expr(&Expr::sequence(all))
    }

    #[test]
    fn test_regex_literal_match() {
        let regex = Regex::from_expr(&Expr::literal_str("abc"));
        assert!(regex.is_match("abc"));
        assert!(regex.is_match("xabcy"));
        assert!(!regex.is_match("ab"));
    }

    #[test]
    fn test_regex_find_offsets() {
        let regex = Regex::from_expr(&Expr::literal_str("abc"));
        let m = regex.find("xabcy").unwrap();
        assert_eq!(m.start, 1);
        assert_eq!(m.end, 4);
        assert_eq!(m.as_str("xabcy"), "abc");
    }

    #[test]
    fn test_anchors() {
        let regex = anchored(vec![Expr::literal_str("ab")]);
        assert!(regex.is_match("ab"));
        assert!(!regex.is_match("xab"));
        assert!(!regex.is_match("abx"));
    }

    #[test]
    fn test_lazy_versus_greedy_capture() {
        // \A([a-z]*?)([a-z]*)\z
        let lazy = anchored(vec![
            Expr::capture(0, Expr::quantified(lower(), Quantifier::ZeroOrMoreLazy)),
            Expr::capture(1, Expr::quantified(lower(), Quantifier::ZeroOrMore)),
        ]);
        let m = lazy.find("abc").unwrap();
        assert_eq!(m.group_str("abc", 0), Some(""));
        assert_eq!(m.group_str("abc", 1), Some("abc"));

        // \A([a-z]*)([a-z]*)\z
        let greedy = anchored(vec![
            Expr::capture(0, Expr::quantified(lower(), Quantifier::ZeroOrMore)),
            Expr::capture(1, Expr::quantified(lower(), Quantifier::ZeroOrMore)),
        ]);
        let m = greedy.find("abc").unwrap();
        assert_eq!(m.group_str("abc", 0), Some("abc"));
        assert_eq!(m.group_str("abc", 1), Some(""));
    }

    #[test]
    fn test_optional_group_not_participating() {
        // \Aa(?:,(b))?\z
        let regex = anchored(vec![
            Expr::literal('a'),
            Expr::optional(Expr::sequence(vec![
                Expr::literal(','),
                Expr::capture(0, Expr::literal('b')),
            ])),
        ]);
        assert_eq!(regex.find("a").unwrap().group(0), None);
        assert_eq!(regex.find("a,b").unwrap().group_str("a,b", 0), Some("b"));
    }

    #[test]
    fn test_failed_branch_restores_capture() {
        // \A(?:(a)x|ay)\z must not report slot 0 for "ay"
        let regex = anchored(vec![Expr::alternation(vec![
            Expr::sequence(vec![Expr::capture(0, Expr::literal('a')), Expr::literal('x')]),
            Expr::literal_str("ay"),
        ])]);
        assert_eq!(regex.find("ay").unwrap().group(0), None);
        assert_eq!(regex.find("ax").unwrap().group(0), Some((0, 1)));
    }

    #[test]
    fn test_shared_slot_across_alternatives() {
        let regex = anchored(vec![Expr::alternation(vec![
            Expr::sequence(vec![Expr::literal('1'), Expr::capture(0, lower())]),
            Expr::sequence(vec![Expr::literal('2'), Expr::capture(0, lower())]),
        ])]);
        assert_eq!(regex.slots(), 1);
        assert_eq!(regex.find("2q").unwrap().group_str("2q", 0), Some("q"));
    }

    #[test]
    fn test_negative_lookahead() {
        // \A([a-z]*?)(?:\z|,(?!,))
        let regex = Regex::from_expr(&Expr::sequence(vec![
            Expr::start_anchor(),
            Expr::capture(0, Expr::quantified(lower(), Quantifier::ZeroOrMoreLazy)),
            Expr::alternation(vec![
                Expr::end_anchor(),
                Expr::sequence(vec![
                    Expr::literal(','),
                    Expr::negative_lookahead(Expr::literal(',')),
                ]),
            ]),
        ]));
        let m = regex.find("ab,cd").unwrap();
        assert_eq!(m.group_str("ab,cd", 0), Some("ab"));
        assert_eq!(m.end, 3);
        assert!(regex.find("ab,,cd").is_none());
    }

    #[test]
    fn test_positive_lookahead() {
        let regex = Regex::from_expr(&Expr::sequence(vec![
            Expr::literal('a'),
            Expr::lookahead(Expr::literal('b')),
        ]));
        let m = regex.find("cab").unwrap();
        assert_eq!((m.start, m.end), (1, 2));
        assert!(!regex.is_match("ac"));
    }

    #[test]
    fn test_counted_repetition() {
        let regex = anchored(vec![Expr::capture(
            0,
            Expr::quantified(lower(), Quantifier::Between(0, 3)),
        )]);
        assert!(regex.is_match("abc"));
        assert!(!regex.is_match("abcd"));
    }

    #[test]
    fn test_large_counted_repetition() {
        let regex = anchored(vec![Expr::capture(
            0,
            Expr::quantified(lower(), Quantifier::Between(0, 100_000)),
        )]);
        assert!(regex.state_count() < 16);
        let input = "a".repeat(5000);
        assert_eq!(regex.find(&input).unwrap().group(0), Some((0, 5000)));
        assert!(!regex.is_match(&format!("{input}!")));
    }

    #[test]
    fn test_counted_repetition_backtracks() {
        // \A([a-z]{1,4})([a-z]{2})\z and its lazy form
        let greedy = anchored(vec![
            Expr::capture(0, Expr::quantified(lower(), Quantifier::Between(1, 4))),
            Expr::capture(1, Expr::quantified(lower(), Quantifier::Exactly(2))),
        ]);
        let m = greedy.find("abcde").unwrap();
        assert_eq!(m.group_str("abcde", 0), Some("abc"));
        assert_eq!(m.group_str("abcde", 1), Some("de"));
        assert!(!greedy.is_match("ab"));

        let lazy = Regex::from_expr(&Expr::sequence(vec![
            Expr::start_anchor(),
            Expr::capture(0, Expr::quantified(lower(), Quantifier::BetweenLazy(1, 4))),
        ]));
        assert_eq!(lazy.find("abcde").unwrap().end, 1);
    }

    #[test]
    fn test_find_contiguous() {
        // ([a-z]*?)(?:\z|,)
        let regex = Regex::from_expr(&Expr::sequence(vec![
            Expr::capture(0, Expr::quantified(lower(), Quantifier::ZeroOrMoreLazy)),
            Expr::alternation(vec![Expr::end_anchor(), Expr::literal(',')]),
        ]));
        let input = "ab,c,,d";
        let found: Vec<_> = regex
            .find_contiguous(input)
            .iter()
            .map(|m| m.group_str(input, 0).unwrap())
            .collect();
        assert_eq!(found, ["ab", "c", "", "d"]);

        let stuck = regex.find_contiguous("ab,C");
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].end, 3);
    }

    #[test]
    fn test_find_contiguous_long_input() {
        let regex = Regex::from_expr(&Expr::sequence(vec![
            Expr::capture(0, Expr::quantified(lower(), Quantifier::ZeroOrMoreLazy)),
            Expr::alternation(vec![
                Expr::end_anchor(),
                Expr::sequence(vec![
                    Expr::literal(','),
                    Expr::negative_lookahead(Expr::literal(',')),
                ]),
            ]),
        ]));
        let input = vec!["ab"; 5000].join(",");
        let matches = regex.find_contiguous(&input);
        assert_eq!(matches.len(), 5000);
        assert_eq!(matches.last().unwrap().end, input.len());
    }

    #[test]
    fn test_multibyte_offsets() {
        let regex = Regex::from_expr(&Expr::capture(0, Expr::literal('b')));
        let input = "äb";
        let m = regex.find(input).unwrap();
        assert_eq!(m.group_str(input, 0), Some("b"));
        assert_eq!(m.start, 2);
    }

    #[test]
    fn test_empty_loop_terminates() {
        // \A(?:a*)*\z
        let regex = anchored(vec![Expr::quantified(
            Expr::quantified(Expr::literal('a'), Quantifier::ZeroOrMore),
            Quantifier::ZeroOrMore,
        )]);
        assert!(regex.is_match("aaa"));
        assert!(!regex.is_match("aab"));
    }

    #[test]
    fn test_pathological_input_stays_linear() {
        // \A(?:[a-z]*?,?)*[a-z]*!\z on a long input without the bang
        let regex = anchored(vec![
            Expr::quantified(
                Expr::sequence(vec![
                    Expr::quantified(lower(), Quantifier::ZeroOrMoreLazy),
                    Expr::optional(Expr::literal(',')),
                ]),
                Quantifier::ZeroOrMore,
            ),
            Expr::quantified(lower(), Quantifier::ZeroOrMore),
            Expr::literal('!'),
        ]);
        let input = "a,".repeat(500);
        assert!(!regex.is_match(&input));
    }
}
