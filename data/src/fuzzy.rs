//! Closest-match lookup for OCR-mangled names.
//!
//! Distances are weighted edit distances (insertion 1, deletion 1, substitution 2),
//! so a substitution never beats deleting and re-inserting a glyph.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Distance reported when there is nothing to match against.
pub const NO_MATCH: usize = 100;

/// Something names can be matched against.
///
/// Ties are broken by iteration order, so ordered vocabularies (slices, `BTree*`)
/// give deterministic results and hashed ones do not.
pub trait Vocabulary {
	fn contains_term(&self, term: &str) -> bool;
	fn terms(&self) -> impl Iterator<Item = &str>;
}

impl<S: AsRef<str>> Vocabulary for [S] {
	fn contains_term(&self, term: &str) -> bool {
		self.iter().any(|v| v.as_ref() == term)
	}

	fn terms(&self) -> impl Iterator<Item = &str> {
		self.iter().map(AsRef::as_ref)
	}
}

impl<S: AsRef<str>> Vocabulary for Vec<S> {
	fn contains_term(&self, term: &str) -> bool {
		self.as_slice().contains_term(term)
	}

	fn terms(&self) -> impl Iterator<Item = &str> {
		self.iter().map(AsRef::as_ref)
	}
}

impl Vocabulary for HashSet<String> {
	fn contains_term(&self, term: &str) -> bool {
		self.contains(term)
	}

	fn terms(&self) -> impl Iterator<Item = &str> {
		self.iter().map(String::as_str)
	}
}

impl Vocabulary for BTreeSet<String> {
	fn contains_term(&self, term: &str) -> bool {
		self.contains(term)
	}

	fn terms(&self) -> impl Iterator<Item = &str> {
		self.iter().map(String::as_str)
	}
}

impl<V> Vocabulary for HashMap<String, V> {
	fn contains_term(&self, term: &str) -> bool {
		self.contains_key(term)
	}

	fn terms(&self) -> impl Iterator<Item = &str> {
		self.keys().map(String::as_str)
	}
}

impl<V> Vocabulary for BTreeMap<String, V> {
	fn contains_term(&self, term: &str) -> bool {
		self.contains_key(term)
	}

	fn terms(&self) -> impl Iterator<Item = &str> {
		self.keys().map(String::as_str)
	}
}

/// Finds the entry of `targets` closest to `query`.
///
/// Returns `("", NO_MATCH)` for an empty query. A target of the form
/// `prefix#variant` is compared by its variant only but returned whole.
pub fn closest_match<V: Vocabulary + ?Sized>(query: &str, targets: &V) -> (String, usize) {
	let query = query.trim();
	if query.is_empty() {
		return (String::new(), NO_MATCH);
	}
	if targets.contains_term(query) {
		return (query.to_owned(), 0);
	}

	let mut best: Option<(&str, usize)> = None;
	for target in targets.terms() {
		let compared = match target.split_once('#') {
			Some((_, variant)) => variant,
			None => target,
		};
		let dist = weighted_distance(query, compared);
		if best.is_none_or(|(_, min)| dist < min) {
			best = Some((target, dist));
		}
	}

	match best {
		Some((name, dist)) => (name.to_owned(), dist),
		None => (String::new(), NO_MATCH),
	}
}

/// Edit distance with insertion and deletion costing 1 and substitution costing 2.
pub fn weighted_distance(a: &str, b: &str) -> usize {
	let a = a.chars().collect::<Vec<_>>();
	let b = b.chars().collect::<Vec<_>>();

	let mut prev = (0..=b.len()).collect::<Vec<_>>();
	let mut row = vec![0; b.len() + 1];
	for (i, ca) in a.iter().enumerate() {
		row[0] = i + 1;
		for (j, cb) in b.iter().enumerate() {
			let substitution = prev[j] + if ca == cb { 0 } else { 2 };
			let deletion = prev[j + 1] + 1;
			let insertion = row[j] + 1;
			row[j + 1] = substitution.min(deletion).min(insertion);
		}
		std::mem::swap(&mut prev, &mut row);
	}

	prev[b.len()]
}
