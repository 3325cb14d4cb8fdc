//! Place/transition model of a 1-safe Petri net.
//!
//! A [`NetModel`] is built once, validated, and read-only afterwards. The input
//! (Pre) and output (Post) matrices carry their [`Orientation`] explicitly; after
//! validation each transition also keeps its input and output places as index
//! lists, and every analysis reads arcs through [`NetModel::inputs`] and
//! [`NetModel::outputs`] only.

use std::collections::HashSet;
use std::fmt;
use std::ops::Index;

use log::debug;

use crate::error::{Error, Result};

/// Layout of an incidence matrix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// One row per transition, one column per place.
    TransitionMajor,
    /// One row per place, one column per transition.
    PlaceMajor,
}

/// Arc weights between places and transitions, in a declared orientation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidenceMatrix {
    orientation: Orientation,
    rows: Vec<Vec<i64>>,
}

impl IncidenceMatrix {
    pub fn new(orientation: Orientation, rows: Vec<Vec<i64>>) -> Result<Self> {
        if let Some(first) = rows.first() {
            let expected = first.len();
            if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
                return Err(Error::RaggedMatrix {
                    row,
                    found: r.len(),
                    expected,
                });
            }
        }
        Ok(Self { orientation, rows })
    }

    pub fn transition_major(rows: Vec<Vec<i64>>) -> Result<Self> {
        Self::new(Orientation::TransitionMajor, rows)
    }

    pub fn place_major(rows: Vec<Vec<i64>>) -> Result<Self> {
        Self::new(Orientation::PlaceMajor, rows)
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    /// Weight of the arc between `transition` and `place`, whatever the layout.
    pub fn get(&self, transition: usize, place: usize) -> i64 {
        match self.orientation {
            Orientation::TransitionMajor => self.rows[transition][place],
            Orientation::PlaceMajor => self.rows[place][transition],
        }
    }

    fn fits(&self, places: usize, transitions: usize) -> bool {
        let (rows, cols) = match self.orientation {
            Orientation::TransitionMajor => (transitions, places),
            Orientation::PlaceMajor => (places, transitions),
        };
        self.num_rows() == rows && (rows == 0 || self.num_cols() == cols)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub id: String,
    pub name: Option<String>,
}

impl Place {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Human-readable name if present, the id otherwise.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub name: Option<String>,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
}

impl Transition {
    /// A transition without arcs; [`NetModel::new`] fills them in from the matrices.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Places whose token is required and consumed, ascending.
    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    /// Places receiving a token, ascending.
    pub fn outputs(&self) -> &[usize] {
        &self.outputs
    }

    /// Output places that are not also inputs: they must be empty before firing.
    pub fn pure_outputs(&self) -> impl Iterator<Item = usize> + '_ {
        self.outputs.iter().copied().filter(move |p| self.inputs.binary_search(p).is_err())
    }

    /// Places consumed without being restored.
    pub fn pure_inputs(&self) -> impl Iterator<Item = usize> + '_ {
        self.inputs.iter().copied().filter(move |p| self.outputs.binary_search(p).is_err())
    }

    /// Every place the transition touches, ascending and without duplicates.
    pub fn touched(&self) -> Vec<usize> {
        let mut places = [self.inputs.as_slice(), self.outputs.as_slice()].concat();
        places.sort_unstable();
        places.dedup();
        places
    }
}

/// Token presence per place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Marking(Vec<bool>);

impl Marking {
    pub fn new(bits: Vec<bool>) -> Self {
        Self(bits)
    }

    pub fn empty(len: usize) -> Self {
        Self(vec![false; len])
    }

    /// Build a marking from 0/1 token counts, e.g. `Marking::from_bits(&[1, 0, 0])`.
    ///
    /// # Panics
    ///
    /// Panics if some entry is neither 0 nor 1.
    pub fn from_bits(bits: &[u8]) -> Self {
        Self(
            bits.iter()
                .map(|&b| {
                    assert!(b <= 1, "Marking entries must be 0 or 1");
                    b == 1
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, place: usize) -> bool {
        self.0[place]
    }

    /// Number of marked places.
    pub fn tokens(&self) -> usize {
        self.0.iter().filter(|&&b| b).count()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn to_bits(&self) -> Vec<u8> {
        self.0.iter().map(|&b| b as u8).collect()
    }

    /// Weighted token sum `Σ w_p · m_p`.
    pub fn dot(&self, weights: &[i64]) -> i64 {
        self.0.iter().zip(weights).filter(|(&b, _)| b).map(|(_, &w)| w).sum()
    }
}

impl Index<usize> for Marking {
    type Output = bool;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<Vec<bool>> for Marking {
    fn from(bits: Vec<bool>) -> Self {
        Self(bits)
    }
}

impl fmt::Display for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, &b) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", b as u8)?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone)]
pub struct NetModel {
    places: Vec<Place>,
    transitions: Vec<Transition>,
    pre: IncidenceMatrix,
    post: IncidenceMatrix,
    initial: Marking,
}

impl NetModel {
    /// Validate the incidence data and build the model.
    ///
    /// `initial` holds token counts per place; each must be 0 or 1.
    /// The arc lists of `transitions` are replaced by what `pre` and `post` say.
    pub fn new(
        places: Vec<Place>,
        transitions: Vec<Transition>,
        pre: IncidenceMatrix,
        post: IncidenceMatrix,
        initial: &[i64],
    ) -> Result<Self> {
        check_unique("place", places.iter().map(|p| p.id.as_str()))?;
        check_unique("transition", transitions.iter().map(|t| t.id.as_str()))?;
        check_incidence(&pre, &post, places.len(), transitions.len())?;

        if initial.len() != places.len() {
            return Err(Error::MarkingLength {
                found: initial.len(),
                expected: places.len(),
            });
        }
        if let Some((p, &tokens)) = initial.iter().enumerate().find(|(_, &m)| !(0..=1).contains(&m)) {
            return Err(Error::NotSafe {
                place: places[p].id.clone(),
                tokens,
            });
        }

        let mut transitions = transitions;
        for (t, transition) in transitions.iter_mut().enumerate() {
            transition.inputs.clear();
            transition.outputs.clear();
            for (p, place) in places.iter().enumerate() {
                for (matrix, arcs) in [(&pre, &mut transition.inputs), (&post, &mut transition.outputs)] {
                    match matrix.get(t, p) {
                        0 => {}
                        1 => arcs.push(p),
                        weight => {
                            return Err(Error::ArcWeight {
                                place: place.id.clone(),
                                transition: transition.id.clone(),
                                weight,
                            })
                        }
                    }
                }
            }
        }

        let initial = Marking(initial.iter().map(|&m| m == 1).collect());
        debug!(
            "net: {} places, {} transitions, {:?}, initial marking {}",
            places.len(),
            transitions.len(),
            pre.orientation(),
            initial
        );

        Ok(Self {
            places,
            transitions,
            pre,
            post,
            initial,
        })
    }

    /// Re-run the structural checks on the incidence data.
    ///
    /// Returns the orientation shared by both matrices.
    pub fn validate(&self) -> Result<Orientation> {
        check_incidence(&self.pre, &self.post, self.places.len(), self.transitions.len())?;
        Ok(self.pre.orientation())
    }

    pub fn num_places(&self) -> usize {
        self.places.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn place(&self, index: usize) -> &Place {
        &self.places[index]
    }

    pub fn transition(&self, index: usize) -> &Transition {
        &self.transitions[index]
    }

    pub fn place_index(&self, id: &str) -> Result<usize> {
        self.places
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::UnknownPlace(id.to_string()))
    }

    pub fn pre(&self) -> &IncidenceMatrix {
        &self.pre
    }

    pub fn post(&self) -> &IncidenceMatrix {
        &self.post
    }

    pub fn inputs(&self, transition: usize) -> &[usize] {
        self.transitions[transition].inputs()
    }

    pub fn outputs(&self, transition: usize) -> &[usize] {
        self.transitions[transition].outputs()
    }

    /// Token change of `place` when `transition` fires (`Post − Pre`).
    pub fn incidence(&self, transition: usize, place: usize) -> i64 {
        self.post.get(transition, place) - self.pre.get(transition, place)
    }

    pub fn initial_marking(&self) -> &Marking {
        &self.initial
    }

    pub fn check_marking(&self, marking: &Marking) -> Result<()> {
        if marking.len() != self.places.len() {
            return Err(Error::MarkingLength {
                found: marking.len(),
                expected: self.places.len(),
            });
        }
        Ok(())
    }

    /// Whether `transition` may fire at `marking` under 1-safe semantics:
    /// every input is marked and every pure output is empty.
    ///
    /// Nothing is enabled at a marking of the wrong length.
    pub fn is_enabled(&self, marking: &Marking, transition: usize) -> bool {
        if self.check_marking(marking).is_err() {
            return false;
        }
        let t = &self.transitions[transition];
        t.inputs.iter().all(|&p| marking[p]) && t.pure_outputs().all(|p| !marking[p])
    }

    pub fn enabled_transitions<'a>(&'a self, marking: &'a Marking) -> impl Iterator<Item = usize> + 'a {
        (0..self.transitions.len()).filter(move |&t| self.is_enabled(marking, t))
    }

    /// No transition is enabled at `marking`, which must be a marking of this net.
    pub fn is_dead(&self, marking: &Marking) -> bool {
        self.check_marking(marking).is_ok() && self.enabled_transitions(marking).next().is_none()
    }

    /// Fire `transition` at `marking`, or `None` if it is not enabled
    /// (including when `marking` has the wrong length).
    pub fn fire(&self, marking: &Marking, transition: usize) -> Option<Marking> {
        if !self.is_enabled(marking, transition) {
            return None;
        }
        let t = &self.transitions[transition];
        let mut next = marking.0.clone();
        for &p in &t.inputs {
            next[p] = false;
        }
        for &p in &t.outputs {
            next[p] = true;
        }
        Some(Marking(next))
    }
}

fn check_unique<'a>(kind: &'static str, ids: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(Error::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

fn check_incidence(pre: &IncidenceMatrix, post: &IncidenceMatrix, places: usize, transitions: usize) -> Result<()> {
    if pre.orientation() != post.orientation() {
        return Err(Error::OrientationMismatch {
            pre: pre.orientation(),
            post: post.orientation(),
        });
    }
    if (pre.num_rows(), pre.num_cols()) != (post.num_rows(), post.num_cols()) {
        return Err(Error::ShapeMismatch {
            pre_rows: pre.num_rows(),
            pre_cols: pre.num_cols(),
            post_rows: post.num_rows(),
            post_cols: post.num_cols(),
        });
    }
    if !pre.fits(places, transitions) {
        return Err(Error::DimensionMismatch {
            orientation: pre.orientation(),
            rows: pre.num_rows(),
            cols: pre.num_cols(),
            places,
            transitions,
        });
    }
    Ok(())
}

/// Incremental construction of a [`NetModel`] by place and transition ids.
///
/// ```
/// use petri_reach::net::NetBuilder;
///
/// let mut builder = NetBuilder::new();
/// let p1 = builder.place("p1", true);
/// let p2 = builder.place("p2", false);
/// builder.transition("t", [p1], [p2]);
/// let net = builder.build().unwrap();
/// assert_eq!(net.num_places(), 2);
/// assert_eq!(net.inputs(0), &[p1]);
/// ```
#[derive(Debug, Default)]
pub struct NetBuilder {
    places: Vec<Place>,
    marked: Vec<i64>,
    transitions: Vec<(Transition, Vec<usize>, Vec<usize>)>,
}

impl NetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a place and return its index.
    pub fn place(&mut self, id: impl Into<String>, marked: bool) -> usize {
        self.places.push(Place::new(id));
        self.marked.push(marked as i64);
        self.places.len() - 1
    }

    /// Declare a transition and return its index.
    pub fn transition(
        &mut self,
        id: impl Into<String>,
        inputs: impl IntoIterator<Item = usize>,
        outputs: impl IntoIterator<Item = usize>,
    ) -> usize {
        self.transitions.push((
            Transition::new(id),
            inputs.into_iter().collect(),
            outputs.into_iter().collect(),
        ));
        self.transitions.len() - 1
    }

    pub fn build(self) -> Result<NetModel> {
        let n = self.places.len();
        let mut pre = Vec::with_capacity(self.transitions.len());
        let mut post = Vec::with_capacity(self.transitions.len());
        let mut transitions = Vec::with_capacity(self.transitions.len());
        for (transition, inputs, outputs) in self.transitions {
            let mut pre_row = vec![0; n];
            let mut post_row = vec![0; n];
            for (arcs, row) in [(&inputs, &mut pre_row), (&outputs, &mut post_row)] {
                for &p in arcs {
                    if p >= n {
                        return Err(Error::UnknownPlace(format!("#{}", p)));
                    }
                    row[p] = 1;
                }
            }
            pre.push(pre_row);
            post.push(post_row);
            transitions.push(transition);
        }
        NetModel::new(
            self.places,
            transitions,
            IncidenceMatrix::transition_major(pre)?,
            IncidenceMatrix::transition_major(post)?,
            &self.marked,
        )
    }
}
