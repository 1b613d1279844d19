use super::Field;
use serde::{Deserialize, Serialize};

/// Defines the physics mode of the analysis
///
/// The physics mode is selected once, at setup time, and defines which fields take part in
/// the convergence check and whether the tangent assembly must correct the right-hand side.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum Physics {
    /// Single-field solid mechanics (displacement)
    Solid,

    /// Biphasic (poro-elastic) analysis: displacement and fluid pressure
    PoroElastic,

    /// Biphasic-solute (poro-solute) analysis: displacement, fluid pressure, and concentration
    PoroSolute,

    /// Heat transfer: temperature
    Thermal,
}

impl Physics {
    /// Returns the fields handled by this physics mode
    pub fn fields(&self) -> &'static [Field] {
        match self {
            Physics::Solid => &[Field::Displacement],
            Physics::PoroElastic => &[Field::Displacement, Field::Pressure],
            Physics::PoroSolute => &[Field::Displacement, Field::Pressure, Field::Concentration],
            Physics::Thermal => &[Field::Temperature],
        }
    }

    /// Returns whether this physics mode handles a field or not
    pub fn handles(&self, field: Field) -> bool {
        self.fields().contains(&field)
    }

    /// Returns whether the right-hand side must be corrected during the tangent assembly
    ///
    /// Transient heat transfer adds the capacitance matrix times the previous temperature
    /// to the right-hand side when the tangent is assembled.
    pub fn rhs_correction(&self, transient: bool) -> bool {
        match self {
            Physics::Thermal => transient,
            _ => false,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
