//! Palette of reference colours and their layer assignments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CamoError, Result};

use super::Colour;

/// A reference colour and the layer it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaletteEntry {
    pub colour: Colour,
    pub layer: u32,
}

impl PaletteEntry {
    pub fn new(colour: Colour, layer: u32) -> Self {
        Self { colour, layer }
    }
}

/// An ordered list of reference colours.
///
/// Entry order is the colour index order used by classification; several
/// entries may share a layer id. Layer ids are positive but need not be
/// contiguous until [`Palette::compact_layer_ids`] runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

impl Palette {
    /// Create an empty palette (auto mode).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a palette from explicit entries.
    pub fn from_entries(entries: Vec<PaletteEntry>) -> Self {
        Self { entries }
    }

    /// Add a colour on a fresh layer (one past the highest id in use).
    ///
    /// Returns `false` without changing anything if the colour is already present.
    pub fn push(&mut self, colour: Colour) -> bool {
        let next = self.entries.iter().map(|e| e.layer).max().unwrap_or(0) + 1;
        self.push_with_layer(colour, next)
    }

    /// Add a colour on a given layer. Duplicate colours are ignored.
    pub fn push_with_layer(&mut self, colour: Colour, layer: u32) -> bool {
        if self.contains(colour) {
            return false;
        }
        self.entries.push(PaletteEntry::new(colour, layer));
        true
    }

    /// Remove the entry at `index` and renumber layers.
    pub fn remove(&mut self, index: usize) -> Option<PaletteEntry> {
        if index >= self.entries.len() {
            return None;
        }
        let removed = self.entries.remove(index);
        self.compact_layer_ids();
        Some(removed)
    }

    /// Move the given entries onto `layer`, then renumber layers.
    ///
    /// Returns how many entries were reassigned.
    pub fn assign(&mut self, indices: &[usize], layer: u32) -> usize {
        let mut changed = 0;
        for &i in indices {
            if let Some(entry) = self.entries.get_mut(i) {
                entry.layer = layer;
                changed += 1;
            }
        }
        if changed > 0 {
            self.compact_layer_ids();
        }
        changed
    }

    /// Renumber the distinct layer ids to `1..=n`, keeping their relative order.
    pub fn compact_layer_ids(&mut self) {
        let ids: Vec<u32> = self.layer_groups().into_keys().collect();
        for entry in &mut self.entries {
            if let Ok(pos) = ids.binary_search(&entry.layer) {
                entry.layer = pos as u32 + 1;
            }
        }
    }

    /// Sort entries by brightness and renumber layers to follow.
    ///
    /// Layers are ordered by the mean channel sum of their colours (brightest
    /// first); entries inside a layer by their own channel sum. Layers are then
    /// numbered `1..=n` in that order. Ties keep their previous order.
    pub fn reorder_by_brightness(&mut self) {
        if self.entries.is_empty() {
            return;
        }

        // Groups in order of first appearance
        let mut groups: Vec<(u32, Vec<PaletteEntry>)> = Vec::new();
        for entry in &self.entries {
            match groups.iter_mut().find(|(id, _)| *id == entry.layer) {
                Some((_, items)) => items.push(*entry),
                None => groups.push((entry.layer, vec![*entry])),
            }
        }

        let brightness = |items: &[PaletteEntry]| {
            items.iter().map(|e| e.colour.channel_sum() as f64).sum::<f64>() / items.len() as f64
        };
        groups.sort_by(|a, b| brightness(&b.1).total_cmp(&brightness(&a.1)));

        let mut reordered = Vec::with_capacity(self.entries.len());
        for (n, (_, mut items)) in groups.into_iter().enumerate() {
            items.sort_by(|a, b| b.colour.channel_sum().cmp(&a.colour.channel_sum()));
            for item in items {
                reordered.push(PaletteEntry::new(item.colour, n as u32 + 1));
            }
        }
        self.entries = reordered;
    }

    /// Map of layer id to the indices of its entries, in ascending id order.
    pub fn layer_groups(&self) -> BTreeMap<u32, Vec<usize>> {
        let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (i, entry) in self.entries.iter().enumerate() {
            groups.entry(entry.layer).or_default().push(i);
        }
        groups
    }

    /// Check the palette is usable for a run.
    pub fn validate(&self) -> Result<()> {
        if let Some(entry) = self.entries.iter().find(|e| e.layer == 0) {
            return Err(CamoError::config(
                format!("palette colour {} is assigned to layer 0", entry.colour),
                "Layer ids start at 1",
            ));
        }
        Ok(())
    }

    /// Reference colours in index order.
    pub fn colours(&self) -> Vec<Colour> {
        self.entries.iter().map(|e| e.colour).collect()
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    pub fn contains(&self, colour: Colour) -> bool {
        self.entries.iter().any(|e| e.colour == colour)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// An empty palette selects automatic clustering.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn layers(p: &Palette) -> Vec<u32> {
        p.entries().iter().map(|e| e.layer).collect()
    }

    #[test]
    fn test_push_assigns_next_layer() {
        let mut p = Palette::new();
        assert!(p.push(Colour::rgb(1, 2, 3)));
        assert!(p.push(Colour::rgb(4, 5, 6)));
        assert_eq!(layers(&p), vec![1, 2]);
    }

    #[test]
    fn test_push_rejects_duplicates() {
        let mut p = Palette::new();
        assert!(p.push(Colour::WHITE));
        assert!(!p.push(Colour::WHITE));
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn test_compact_layer_ids() {
        let mut p = Palette::from_entries(vec![
            PaletteEntry::new(Colour::rgb(0, 0, 1), 7),
            PaletteEntry::new(Colour::rgb(0, 0, 2), 3),
            PaletteEntry::new(Colour::rgb(0, 0, 3), 7),
            PaletteEntry::new(Colour::rgb(0, 0, 4), 12),
        ]);
        p.compact_layer_ids();
        assert_eq!(layers(&p), vec![2, 1, 2, 3]);
    }

    #[test]
    fn test_remove_compacts() {
        let mut p = Palette::from_entries(vec![
            PaletteEntry::new(Colour::rgb(0, 0, 1), 1),
            PaletteEntry::new(Colour::rgb(0, 0, 2), 2),
            PaletteEntry::new(Colour::rgb(0, 0, 3), 3),
        ]);
        let removed = p.remove(1).unwrap();
        assert_eq!(removed.colour, Colour::rgb(0, 0, 2));
        assert_eq!(layers(&p), vec![1, 2]);
        assert!(p.remove(10).is_none());
    }

    #[test]
    fn test_assign_merges_layers() {
        let mut p = Palette::from_entries(vec![
            PaletteEntry::new(Colour::rgb(0, 0, 1), 1),
            PaletteEntry::new(Colour::rgb(0, 0, 2), 2),
            PaletteEntry::new(Colour::rgb(0, 0, 3), 3),
        ]);
        assert_eq!(p.assign(&[0, 2], 3), 2);
        assert_eq!(layers(&p), vec![2, 1, 2]);
    }

    #[test]
    fn test_reorder_by_brightness() {
        let dark = Colour::rgb(10, 10, 10);
        let mid = Colour::rgb(100, 100, 100);
        let light = Colour::rgb(240, 240, 240);
        let grey = Colour::rgb(120, 120, 120);
        let mut p = Palette::from_entries(vec![
            PaletteEntry::new(dark, 1),
            PaletteEntry::new(mid, 2),
            PaletteEntry::new(light, 3),
            PaletteEntry::new(grey, 2),
        ]);
        p.reorder_by_brightness();
        assert_eq!(
            p.entries(),
            &[
                PaletteEntry::new(light, 1),
                PaletteEntry::new(grey, 2),
                PaletteEntry::new(mid, 2),
                PaletteEntry::new(dark, 3),
            ]
        );
    }

    #[test]
    fn test_layer_groups_sorted() {
        let p = Palette::from_entries(vec![
            PaletteEntry::new(Colour::rgb(0, 0, 1), 2),
            PaletteEntry::new(Colour::rgb(0, 0, 2), 1),
            PaletteEntry::new(Colour::rgb(0, 0, 3), 2),
        ]);
        let groups: Vec<(u32, Vec<usize>)> = p.layer_groups().into_iter().collect();
        assert_eq!(groups, vec![(1, vec![1]), (2, vec![0, 2])]);
    }

    #[test]
    fn test_validate_rejects_layer_zero() {
        let p = Palette::from_entries(vec![PaletteEntry::new(Colour::BLACK, 0)]);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_parse_from_yaml() {
        let yaml = "- colour: '#ff0000'\n  layer: 1\n- colour: '#0000ff'\n  layer: 2\n";
        let p: Palette = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(p.colours(), vec![Colour::rgb(255, 0, 0), Colour::rgb(0, 0, 255)]);
        assert_eq!(layers(&p), vec![1, 2]);
    }
}
