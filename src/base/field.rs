use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Defines the number of physical fields
pub const NFIELD: usize = 4;

/// Defines the physical fields (categories of unknowns)
///
/// Note: The fixed numbering scheme assists in sorting and in the indexing of [FieldTable].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Field {
    /// Displacement (solid skeleton)
    Displacement = 0,

    /// Fluid pressure
    Pressure = 1,

    /// Solute concentration
    Concentration = 2,

    /// Temperature
    Temperature = 3,
}

impl Field {
    /// Holds all fields sorted according to the enum value
    pub const ALL: [Field; NFIELD] = [
        Field::Displacement,
        Field::Pressure,
        Field::Concentration,
        Field::Temperature,
    ];

    /// Returns the index of this field in a [FieldTable]
    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Returns a short name used in tables
    pub fn name(&self) -> &'static str {
        match self {
            Field::Displacement => "displacement",
            Field::Pressure => "fluid pressure",
            Field::Concentration => "solute concentration",
            Field::Temperature => "temperature",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Holds one value per physical field
///
/// This is a small fixed-size table keyed by [Field] such that the per-field quantities
/// (tolerances, norms, accumulators) can be inspected and tested in isolation.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FieldTable<T> {
    values: [T; NFIELD],
}

impl<T> FieldTable<T> {
    /// Allocates a new table by calling `f` for each field
    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(Field) -> T,
    {
        FieldTable {
            values: [
                f(Field::Displacement),
                f(Field::Pressure),
                f(Field::Concentration),
                f(Field::Temperature),
            ],
        }
    }

    /// Returns an iterator over (field, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (Field, &T)> {
        Field::ALL.into_iter().zip(self.values.iter())
    }

    /// Returns an iterator over (field, mutable value) pairs
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Field, &mut T)> {
        Field::ALL.into_iter().zip(self.values.iter_mut())
    }
}

impl<T: Clone> FieldTable<T> {
    /// Allocates a new table with the same value for all fields
    pub fn filled(value: T) -> Self {
        FieldTable::from_fn(|_| value.clone())
    }
}

impl<T> Index<Field> for FieldTable<T> {
    type Output = T;
    #[inline]
    fn index(&self, field: Field) -> &Self::Output {
        &self.values[field.index()]
    }
}

impl<T> IndexMut<Field> for FieldTable<T> {
    #[inline]
    fn index_mut(&mut self, field: Field) -> &mut Self::Output {
        &mut self.values[field.index()]
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
