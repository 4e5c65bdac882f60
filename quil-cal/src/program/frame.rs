// Copyright 2021 Rigetti Computing
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::instruction::{FrameAttributes, FrameDefinition, FrameIdentifier, Instruction, Qubit};

/// A collection of Quil frames (`DEFFRAME` instructions) with utility methods.
///
/// Frames are kept in the order they were first defined.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameSet {
    frames: IndexMap<FrameIdentifier, FrameAttributes>,
}

impl FrameSet {
    pub fn new() -> Self {
        FrameSet {
            frames: IndexMap::new(),
        }
    }

    /// Retrieve the attributes of a frame by its identifier.
    pub fn get(&self, identifier: &FrameIdentifier) -> Option<&FrameAttributes> {
        self.frames.get(identifier)
    }

    /// Retrieve the full `DEFFRAME` for a frame by its identifier.
    pub fn get_definition(&self, identifier: &FrameIdentifier) -> Option<FrameDefinition> {
        self.frames
            .get_key_value(identifier)
            .map(|(identifier, attributes)| {
                FrameDefinition::new(identifier.clone(), attributes.clone())
            })
    }

    /// Return a list of all frame IDs described by this FrameSet.
    pub fn get_keys(&self) -> Vec<&FrameIdentifier> {
        self.frames.keys().collect()
    }

    /// Return all frames which act on the given qubit.
    pub fn get_frames_for_qubit<'s>(&'s self, qubit: &Qubit) -> Vec<&'s FrameIdentifier> {
        self.frames
            .keys()
            .filter(|identifier| identifier.qubits.contains(qubit))
            .collect()
    }

    /// Insert a new frame by ID, overwriting any existing one.
    pub fn insert(&mut self, identifier: FrameIdentifier, attributes: FrameAttributes) {
        self.frames.insert(identifier, attributes);
    }

    /// Merge another [FrameSet] with this one, overwriting any existing keys
    pub fn merge(&mut self, other: FrameSet) {
        self.frames.extend(other.frames);
    }

    /// Return a new [FrameSet] which describes only the given [FrameIdentifier]s.
    pub fn intersection(&self, identifiers: &HashSet<&FrameIdentifier>) -> Self {
        let mut new_frameset = Self::new();

        for (identifier, definition) in &self.frames {
            if identifiers.contains(&identifier) {
                new_frameset.insert(identifier.clone(), definition.clone())
            }
        }

        new_frameset
    }

    /// Iterate through the contained frames.
    pub fn iter(&self) -> indexmap::map::Iter<'_, FrameIdentifier, FrameAttributes> {
        self.frames.iter()
    }

    /// Return the number of frames described within.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Return true if this describes no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Return the Quil instructions which describe the contained frames, consuming the [`FrameSet`].
    pub fn into_instructions(self) -> Vec<Instruction> {
        self.frames
            .into_iter()
            .map(|(identifier, attributes)| {
                Instruction::FrameDefinition(FrameDefinition {
                    identifier,
                    attributes,
                })
            })
            .collect()
    }

    /// Return the Quil instructions which describe the contained frames.
    pub fn to_instructions(&self) -> Vec<Instruction> {
        self.frames
            .iter()
            .map(|(identifier, attributes)| {
                Instruction::FrameDefinition(FrameDefinition {
                    identifier: identifier.clone(),
                    attributes: attributes.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::FrameSet;
    use crate::instruction::{FrameAttributes, FrameIdentifier, Qubit};

    fn frame(name: &str, qubit: u64) -> FrameIdentifier {
        FrameIdentifier::new(name.to_string(), vec![Qubit::Fixed(qubit)])
    }

    #[test]
    fn keeps_definition_order() {
        let mut frames = FrameSet::new();
        frames.insert(frame("ro_tx", 0), FrameAttributes::new());
        frames.insert(frame("rf", 0), FrameAttributes::new());
        frames.insert(frame("rf", 1), FrameAttributes::new());
        assert_eq!(
            frames.get_keys(),
            vec![&frame("ro_tx", 0), &frame("rf", 0), &frame("rf", 1)]
        );
        assert_eq!(
            frames.get_frames_for_qubit(&Qubit::Fixed(0)),
            vec![&frame("ro_tx", 0), &frame("rf", 0)]
        );
    }

    #[test]
    fn intersection_keeps_only_requested_frames() {
        let mut frames = FrameSet::new();
        frames.insert(frame("rf", 0), FrameAttributes::new());
        frames.insert(frame("rf", 1), FrameAttributes::new());
        let wanted = frame("rf", 1);
        let subset = frames.intersection(&HashSet::from([&wanted]));
        assert_eq!(subset.len(), 1);
        assert!(subset.get(&wanted).is_some());
        assert!(subset.get_definition(&frame("rf", 0)).is_none());
    }
}
