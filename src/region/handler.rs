//! # Region Handler
//!
//! An in-memory registry of named regions with two independent
//! namespaces, regions and masks, plus a single default-mask slot. The
//! same name may exist in both namespaces at once; lookups with
//! [`GroupType::Any`] check regions first, then masks.

use crate::region::{GroupType, Region, Volume};
use eyre::{bail, ensure, Result};
use hashbrown::HashMap;

const GROUP_REGIONS: usize = 0;
const GROUP_MASKS: usize = 1;

fn group_name(slot: usize) -> &'static str {
    if slot == GROUP_REGIONS {
        "regions"
    } else {
        "masks"
    }
}

/// Registry of named regions and masks.
#[derive(Default)]
pub struct RegionHandler {
    maps: [HashMap<String, Region>; 2],
    default_mask: String,
}

impl RegionHandler {
    pub fn new() -> Self {
        RegionHandler::default()
    }

    /// Whether this handler accepts region definitions at all. Handlers
    /// backed by immutable datasets would answer false.
    pub fn can_define_region(&self) -> bool {
        true
    }

    fn slot(group: GroupType) -> Result<usize> {
        match group {
            GroupType::Regions => Ok(GROUP_REGIONS),
            GroupType::Masks => Ok(GROUP_MASKS),
            GroupType::Any => bail!("a definition group must be regions or masks, not any"),
        }
    }

    /// Namespace the name resolves in, honoring the regions-first order
    /// for [`GroupType::Any`].
    fn find_group(&self, name: &str, group: GroupType) -> Option<usize> {
        let candidates: &[usize] = match group {
            GroupType::Regions => &[GROUP_REGIONS],
            GroupType::Masks => &[GROUP_MASKS],
            GroupType::Any => &[GROUP_REGIONS, GROUP_MASKS],
        };
        candidates
            .iter()
            .copied()
            .find(|&slot| self.maps[slot].contains_key(name))
    }

    pub fn define_region(
        &mut self,
        name: &str,
        region: Region,
        group: GroupType,
        overwrite: bool,
    ) -> Result<()> {
        let slot = Self::slot(group)?;
        ensure!(
            overwrite || !self.maps[slot].contains_key(name),
            "a region named '{}' already exists in the {} group",
            name,
            group_name(slot)
        );
        self.maps[slot].insert(name.to_string(), region);
        Ok(())
    }

    pub fn has_region(&self, name: &str, group: GroupType) -> bool {
        self.find_group(name, group).is_some()
    }

    /// Looks the name up and clones the stored region.
    pub fn get_region(&self, name: &str, group: GroupType) -> Result<Region> {
        match self.try_get_region(name, group) {
            Some(region) => Ok(region),
            None => bail!("region '{}' not found", name),
        }
    }

    pub fn try_get_region(&self, name: &str, group: GroupType) -> Option<Region> {
        let slot = self.find_group(name, group)?;
        self.maps[slot].get(name).cloned()
    }

    /// Renames a region within the namespace the old name resolves in.
    /// Fails without touching anything when the old name is absent or the
    /// new name is taken and `overwrite` is false.
    pub fn rename_region(
        &mut self,
        new_name: &str,
        old_name: &str,
        group: GroupType,
        overwrite: bool,
    ) -> Result<()> {
        let slot = match self.find_group(old_name, group) {
            Some(slot) => slot,
            None => bail!("region '{}' not found", old_name),
        };
        if new_name == old_name {
            return Ok(());
        }
        ensure!(
            overwrite || !self.maps[slot].contains_key(new_name),
            "a region named '{}' already exists in the {} group",
            new_name,
            group_name(slot)
        );
        // INVARIANT: find_group just resolved old_name in this slot
        let region = self.maps[slot].remove(old_name).unwrap();
        self.maps[slot].insert(new_name.to_string(), region);
        if self.default_mask == old_name && slot == GROUP_MASKS {
            self.default_mask = new_name.to_string();
        }
        Ok(())
    }

    pub fn remove_region(&mut self, name: &str, group: GroupType) -> Result<()> {
        ensure!(self.try_remove_region(name, group), "region '{}' not found", name);
        Ok(())
    }

    /// Removes the region if present; reports whether anything was removed.
    pub fn try_remove_region(&mut self, name: &str, group: GroupType) -> bool {
        match self.find_group(name, group) {
            Some(slot) => self.maps[slot].remove(name).is_some(),
            None => false,
        }
    }

    /// All names in the group; order is unspecified.
    pub fn region_names(&self, group: GroupType) -> Vec<String> {
        let slots: &[usize] = match group {
            GroupType::Regions => &[GROUP_REGIONS],
            GroupType::Masks => &[GROUP_MASKS],
            GroupType::Any => &[GROUP_REGIONS, GROUP_MASKS],
        };
        slots
            .iter()
            .flat_map(|&slot| self.maps[slot].keys().cloned())
            .collect()
    }

    /// Sets the default mask name. The empty string clears it; no
    /// existence check is made.
    pub fn set_default_mask(&mut self, name: &str) {
        self.default_mask = name.to_string();
    }

    /// The default mask name; empty when unset.
    pub fn default_mask(&self) -> &str {
        &self.default_mask
    }

    /// Builds a mask placeholder sized for the given volume. Never touches
    /// the stored entries.
    pub fn make_mask(&self, volume: &Volume, name: &str) -> Region {
        Region::Mask {
            shape: volume.shape().clone(),
            tile_shape: volume.tile_shape().clone(),
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;

    fn sample_box() -> Region {
        Region::Box {
            blc: vec![0, 0],
            trc: vec![9, 9],
        }
    }

    #[test]
    fn namespaces_are_independent() {
        let mut h = RegionHandler::new();
        h.define_region("r", sample_box(), GroupType::Regions, false)
            .unwrap();
        h.define_region("r", sample_box(), GroupType::Masks, false)
            .unwrap();
        assert!(h.has_region("r", GroupType::Regions));
        assert!(h.has_region("r", GroupType::Masks));
        assert_eq!(h.region_names(GroupType::Any).len(), 2);
    }

    #[test]
    fn duplicate_definition_needs_overwrite() {
        let mut h = RegionHandler::new();
        h.define_region("r", sample_box(), GroupType::Regions, false)
            .unwrap();
        let err = h
            .define_region("r", sample_box(), GroupType::Regions, false)
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
        h.define_region("r", sample_box(), GroupType::Regions, true)
            .unwrap();
    }

    #[test]
    fn definitions_into_the_any_group_are_rejected() {
        let mut h = RegionHandler::new();
        assert!(h
            .define_region("r", sample_box(), GroupType::Any, false)
            .is_err());
    }

    #[test]
    fn any_lookup_prefers_the_regions_namespace() {
        let mut h = RegionHandler::new();
        let mask = Region::Mask {
            shape: Shape::from([4]),
            tile_shape: Shape::from([2]),
            name: "m".into(),
        };
        h.define_region("x", mask, GroupType::Masks, false).unwrap();
        h.define_region("x", sample_box(), GroupType::Regions, false)
            .unwrap();
        assert_eq!(h.get_region("x", GroupType::Any).unwrap(), sample_box());
    }

    #[test]
    fn get_and_try_get_pair_up() {
        let h = RegionHandler::new();
        assert!(h.try_get_region("missing", GroupType::Any).is_none());
        let err = h.get_region("missing", GroupType::Any).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn rename_stays_in_the_resolved_namespace() {
        let mut h = RegionHandler::new();
        h.define_region("old", sample_box(), GroupType::Masks, false)
            .unwrap();
        h.rename_region("new", "old", GroupType::Any, false).unwrap();
        assert!(!h.has_region("old", GroupType::Any));
        assert!(h.has_region("new", GroupType::Masks));
        assert!(!h.has_region("new", GroupType::Regions));
    }

    #[test]
    fn failed_rename_changes_nothing() {
        let mut h = RegionHandler::new();
        h.define_region("a", sample_box(), GroupType::Regions, false)
            .unwrap();
        h.define_region("b", sample_box(), GroupType::Regions, false)
            .unwrap();
        assert!(h.rename_region("b", "a", GroupType::Regions, false).is_err());
        assert!(h.has_region("a", GroupType::Regions));
        assert!(h.has_region("b", GroupType::Regions));
        assert!(h
            .rename_region("c", "missing", GroupType::Regions, false)
            .is_err());
    }

    #[test]
    fn rename_follows_the_default_mask() {
        let mut h = RegionHandler::new();
        let mask = Region::Mask {
            shape: Shape::from([4]),
            tile_shape: Shape::from([2]),
            name: "m".into(),
        };
        h.define_region("m", mask, GroupType::Masks, false).unwrap();
        h.set_default_mask("m");
        h.rename_region("m2", "m", GroupType::Masks, false).unwrap();
        assert_eq!(h.default_mask(), "m2");
    }

    #[test]
    fn remove_distinguishes_missing_from_removed() {
        let mut h = RegionHandler::new();
        h.define_region("r", sample_box(), GroupType::Regions, false)
            .unwrap();
        assert!(h.try_remove_region("r", GroupType::Any));
        assert!(!h.try_remove_region("r", GroupType::Any));
        assert!(h.remove_region("r", GroupType::Any).is_err());
    }

    #[test]
    fn default_mask_is_a_bare_slot() {
        let mut h = RegionHandler::new();
        assert_eq!(h.default_mask(), "");
        h.set_default_mask("never_defined");
        assert_eq!(h.default_mask(), "never_defined");
        h.set_default_mask("");
        assert_eq!(h.default_mask(), "");
    }

    #[test]
    fn make_mask_sizes_against_the_volume() {
        let h = RegionHandler::new();
        let volume = Volume::new(Shape::from([64, 64]), Shape::from([16, 16])).unwrap();
        let mask = h.make_mask(&volume, "m");
        assert_eq!(
            mask,
            Region::Mask {
                shape: Shape::from([64, 64]),
                tile_shape: Shape::from([16, 16]),
                name: "m".into(),
            }
        );
    }
}
