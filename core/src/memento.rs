use alloc::collections::BTreeMap;
use hashbrown::HashMap;

use crate::*;

/// Serialized form of the store: cell key to tier, `None` for an emptied cell.
pub type SerializedCells = BTreeMap<String, Option<Tier>>;

/// Last known outcome of every touched cell. Once a cell has an entry it is
/// never generated again.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellMementoStore {
    cells: HashMap<CellAddress, CellOutcome>,
}

impl CellMementoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded outcome, `None` when the cell was never touched.
    pub fn get(&self, addr: CellAddress) -> Option<CellOutcome> {
        self.cells.get(&addr).copied()
    }

    pub fn set(&mut self, addr: CellAddress, outcome: CellOutcome) {
        if let Some(previous) = self.cells.insert(addr, outcome) {
            if previous != outcome {
                log::trace!("memento {}: {:?} -> {:?}", addr, previous, outcome);
            }
        }
    }

    pub fn contains(&self, addr: CellAddress) -> bool {
        self.cells.contains_key(&addr)
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellAddress, CellOutcome)> + '_ {
        self.cells.iter().map(|(&addr, &outcome)| (addr, outcome))
    }

    pub fn serialize(&self) -> SerializedCells {
        self.iter()
            .map(|(addr, outcome)| (addr.key(), outcome.tier()))
            .collect()
    }

    pub fn deserialize(cells: &SerializedCells) -> Result<Self> {
        let cells = cells
            .iter()
            .map(|(key, &tier)| -> Result<(CellAddress, CellOutcome)> {
                let addr: CellAddress = key.parse()?;
                // only canonical keys, so no two entries can name the same cell
                if addr.key() != *key {
                    return Err(GameError::InvalidCellKey(key.clone()));
                }
                Ok((addr, CellOutcome::from_tier(tier)))
            })
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self { cells })
    }

    /// Replaces every entry with the contents of `cells`. On error the store is
    /// left unchanged.
    pub fn replace_with(&mut self, cells: &SerializedCells) -> Result<()> {
        *self = Self::deserialize(cells)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(value: u8) -> Tier {
        Tier::new(value).unwrap()
    }

    #[test]
    fn untouched_cells_have_no_entry() {
        let store = CellMementoStore::new();

        assert_eq!(store.get(CellAddress::new(0, 0)), None);
        assert!(store.is_empty());
    }

    #[test]
    fn set_overwrites_previous_outcome() {
        let mut store = CellMementoStore::new();
        let addr = CellAddress::new(1, -1);

        store.set(addr, CellOutcome::Token(tier(1)));
        store.set(addr, CellOutcome::Token(tier(2)));
        store.set(addr, CellOutcome::Token(tier(2)));

        assert_eq!(store.get(addr), Some(CellOutcome::Token(tier(2))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn serialize_uses_cell_keys_and_null_for_empty() {
        let mut store = CellMementoStore::new();
        store.set(CellAddress::new(0, 0), CellOutcome::Empty);
        store.set(CellAddress::new(-3, 4), CellOutcome::Token(tier(3)));

        let json = serde_json::to_string(&store.serialize()).unwrap();

        assert_eq!(json, r#"{"-3,4":3,"0,0":null}"#);
    }

    #[test]
    fn replace_discards_existing_entries() {
        let mut store = CellMementoStore::new();
        store.set(CellAddress::new(9, 9), CellOutcome::Empty);
        let incoming = SerializedCells::from([("1,2".to_string(), Some(tier(4)))]);

        store.replace_with(&incoming).unwrap();

        assert_eq!(store.get(CellAddress::new(9, 9)), None);
        assert_eq!(
            store.get(CellAddress::new(1, 2)),
            Some(CellOutcome::Token(tier(4)))
        );
    }

    #[test]
    fn replace_with_bad_key_keeps_store() {
        let mut store = CellMementoStore::new();
        store.set(CellAddress::new(0, 1), CellOutcome::Empty);
        let incoming = SerializedCells::from([("nope".to_string(), None)]);

        assert!(store.replace_with(&incoming).is_err());
        assert_eq!(store.get(CellAddress::new(0, 1)), Some(CellOutcome::Empty));
    }

    #[test]
    fn non_canonical_keys_are_rejected() {
        for key in [" 1,2", "+1,2", "1,02", "1, 2", "-0,0"] {
            let cells = SerializedCells::from([("1,2".to_string(), Some(tier(3))), (key.to_string(), None)]);

            assert_eq!(
                CellMementoStore::deserialize(&cells),
                Err(GameError::InvalidCellKey(key.to_string())),
                "{key:?}"
            );
        }
    }

    #[test]
    fn empty_store_round_trips() {
        let store = CellMementoStore::new();

        assert_eq!(CellMementoStore::deserialize(&store.serialize()).unwrap(), store);
    }
}
