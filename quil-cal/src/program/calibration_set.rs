use crate::instruction::CalibrationSignature;

/// A [`CalibrationSet`] is a collection of calibration instructions that respect how
/// calibrations work in a Quil program.
///
/// Calibrations are matched to instructions using their unique [`CalibrationSignature`], so
/// only one calibration is kept per signature: inserting a calibration with a signature that is
/// already present replaces the earlier one.
///
/// Calibration instructions are global. That is, their order or location in a program make no
/// semantic difference, so two sets are equal if they hold the same calibrations in any order.
/// Insertion order is kept so that the same set serializes deterministically.
#[derive(Clone, Debug)]
pub struct CalibrationSet<T> {
    // The amount of calibrations in a program tends to be small enough that a Vec is more
    // performant than a typical set.
    data: Vec<T>,
}

impl<T> Default for CalibrationSet<T>
where
    T: CalibrationSignature,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntoIterator for CalibrationSet<T> {
    type IntoIter = std::vec::IntoIter<Self::Item>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<T> From<Vec<T>> for CalibrationSet<T>
where
    T: CalibrationSignature,
{
    fn from(data: Vec<T>) -> Self {
        let mut set = Self::new();
        for element in data {
            set.replace(element);
        }
        set
    }
}

impl<T> CalibrationSet<T>
where
    T: CalibrationSignature,
{
    /// Creates an empty [`CalibrationSet`].
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Returns the length of the [`CalibrationSet`].
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns whether the [`CalibrationSet`] is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator of references to the values in the set.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Adds a value to the set, replacing and returning an existing value with the same
    /// [`CalibrationSignature`], if it exists.
    pub fn replace(&mut self, value: T) -> Option<T> {
        let position = self.signature_position(&value.signature());
        if let Some(index) = position {
            let replaced = std::mem::replace(&mut self.data[index], value);
            Some(replaced)
        } else {
            self.data.push(value);
            None
        }
    }

    /// Removes a value from the set. Returns whether the value was present in the set.
    pub fn remove(&mut self, signature: &<T as CalibrationSignature>::Signature<'_>) -> bool {
        if let Some(index) = self.signature_position(signature) {
            self.data.remove(index);
            true
        } else {
            false
        }
    }

    /// Returns the index of an element whose [`CalibrationSignature`] matches the given value, if one exists.
    fn signature_position(
        &self,
        signature: &<T as CalibrationSignature>::Signature<'_>,
    ) -> Option<usize> {
        self.data
            .iter()
            .position(|element| element.has_signature(signature))
    }
}

impl<T> Extend<T> for CalibrationSet<T>
where
    T: CalibrationSignature,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        for value in iter {
            self.replace(value);
        }
    }
}

impl<T> PartialEq for CalibrationSet<T>
where
    T: CalibrationSignature + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.data.iter().all(|element| {
                other
                    .data
                    .iter()
                    .find(|candidate| candidate.has_signature(&element.signature()))
                    .is_some_and(|candidate| candidate == element)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::CalibrationSet;
    use crate::instruction::{
        CalibrationDefinition, CalibrationIdentifier, CalibrationSignature, Fence, Instruction,
        Qubit,
    };

    fn calibration(qubit: u64, body: Vec<Instruction>) -> CalibrationDefinition {
        CalibrationDefinition::new(
            CalibrationIdentifier::new("X".to_string(), vec![], vec![Qubit::Fixed(qubit)])
                .unwrap(),
            body,
        )
    }

    #[test]
    fn replace_keeps_one_per_signature() {
        let mut set = CalibrationSet::new();
        assert!(set.replace(calibration(0, vec![])).is_none());
        assert!(set.replace(calibration(1, vec![])).is_none());
        let fence = Instruction::Fence(Fence::new(vec![Qubit::Fixed(0)]));
        let replaced = set.replace(calibration(0, vec![fence.clone()]));
        assert_eq!(replaced, Some(calibration(0, vec![])));
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().next().unwrap().instructions, vec![fence]);
    }

    #[test]
    fn equality_ignores_order() {
        let forward = CalibrationSet::from(vec![calibration(0, vec![]), calibration(1, vec![])]);
        let backward = CalibrationSet::from(vec![calibration(1, vec![]), calibration(0, vec![])]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn remove_by_signature() {
        let mut set = CalibrationSet::from(vec![calibration(0, vec![])]);
        let target = calibration(0, vec![]);
        assert!(set.remove(&target.signature()));
        assert!(set.is_empty());
    }
}
