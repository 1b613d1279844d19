use super::{Field, FieldTable};
use crate::StrError;
use russell_lab::Vector;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maps the global equations into physical fields
///
/// Every equation belongs to exactly one field or is excluded (e.g., prescribed or constrained).
/// The partition is created once per step, when the active equations are known, and is not
/// modified during the step.
///
/// # Examples
///
/// ```
/// use qnsolve::base::{EquationPartition, Field};
/// use qnsolve::StrError;
///
/// fn main() -> Result<(), StrError> {
///     //   0    1    2    3    4    5
///     //  ux   uy   pl   ux   uy   (prescribed)
///     let partition = EquationPartition::new(
///         6,
///         vec![
///             (Field::Displacement, vec![0, 1, 3, 4]),
///             (Field::Pressure, vec![2]),
///         ],
///     )?;
///     assert_eq!(partition.equations(Field::Displacement), &[0, 1, 3, 4]);
///     assert_eq!(partition.field_of(2), Some(Field::Pressure));
///     assert_eq!(partition.field_of(5), None);
///     assert_eq!(partition.n_active(), 5);
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EquationPartition {
    /// Holds the total number of global equations (including the excluded ones)
    n_equation: usize,

    /// Holds the sorted equation numbers of each field
    equations: FieldTable<Vec<usize>>,

    /// Holds the field of each equation or None if the equation is excluded
    ///
    /// (n_equation)
    owner: Vec<Option<Field>>,
}

impl EquationPartition {
    /// Allocates a new instance
    ///
    /// # Input
    ///
    /// * `n_equation` -- total number of global equations
    /// * `sets` -- the equation numbers of each field; the fields must not repeat and the
    ///   sets must be disjoint. Equations not listed in any set are excluded.
    pub fn new(n_equation: usize, sets: Vec<(Field, Vec<usize>)>) -> Result<Self, StrError> {
        let mut equations = FieldTable::from_fn(|_| Vec::new());
        let mut given = FieldTable::filled(false);
        let mut owner = vec![None; n_equation];
        for (field, mut eqs) in sets {
            if given[field] {
                return Err("a field cannot be given more than once in the partition");
            }
            given[field] = true;
            for eq in &eqs {
                if *eq >= n_equation {
                    return Err("equation number is out of range");
                }
                if owner[*eq].is_some() {
                    return Err("an equation cannot belong to more than one field");
                }
                owner[*eq] = Some(field);
            }
            eqs.sort();
            equations[field] = eqs;
        }
        Ok(EquationPartition {
            n_equation,
            equations,
            owner,
        })
    }

    /// Allocates a partition with all equations belonging to a single field
    pub fn single(field: Field, n_equation: usize) -> Self {
        let mut equations = FieldTable::from_fn(|_| Vec::new());
        equations[field] = (0..n_equation).collect();
        EquationPartition {
            n_equation,
            equations,
            owner: vec![Some(field); n_equation],
        }
    }

    /// Returns the total number of global equations (including the excluded ones)
    #[inline]
    pub fn n_equation(&self) -> usize {
        self.n_equation
    }

    /// Returns the number of equations belonging to some field
    pub fn n_active(&self) -> usize {
        self.equations.iter().map(|(_, eqs)| eqs.len()).sum()
    }

    /// Returns the (sorted) equations of a field
    #[inline]
    pub fn equations(&self, field: Field) -> &[usize] {
        &self.equations[field]
    }

    /// Returns the field of an equation or None if the equation is excluded or out of range
    pub fn field_of(&self, eq: usize) -> Option<Field> {
        match self.owner.get(eq) {
            Some(f) => *f,
            None => None,
        }
    }

    /// Returns the fields with at least one equation (sorted)
    pub fn active_fields(&self) -> Vec<Field> {
        self.equations
            .iter()
            .filter(|(_, eqs)| eqs.len() > 0)
            .map(|(field, _)| field)
            .collect()
    }

    /// Copies the entries of a field from a global vector into a sub-vector
    ///
    /// The sub-vector must have dimension equal to the number of equations of the field.
    pub fn gather(&self, field: Field, full: &Vector, sub: &mut Vector) -> Result<(), StrError> {
        if full.dim() != self.n_equation {
            return Err("the global vector has an incompatible dimension");
        }
        let eqs = &self.equations[field];
        if sub.dim() != eqs.len() {
            return Err("the sub-vector has an incompatible dimension");
        }
        for (k, eq) in eqs.iter().enumerate() {
            sub[k] = full[*eq];
        }
        Ok(())
    }

    /// Returns the squared Euclidean norm of the entries of a field in a global vector
    ///
    /// **Note:** The dimension of the vector is assumed to be equal to `n_equation`.
    pub fn norm_sq(&self, field: Field, full: &Vector) -> f64 {
        self.equations[field].iter().fold(0.0, |acc, eq| acc + full[*eq] * full[*eq])
    }
}

impl fmt::Display for EquationPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fields: equation numbers\n")?;
        write!(f, "========================\n")?;
        for (field, eqs) in self.equations.iter() {
            if eqs.len() > 0 {
                write!(f, "{}: {:?}\n", field, eqs)?;
            }
        }
        let excluded: Vec<_> = (0..self.n_equation).filter(|eq| self.owner[*eq].is_none()).collect();
        write!(f, "excluded: {:?}\n", excluded)?;
        write!(f, "\nInformation\n")?;
        write!(f, "===========\n")?;
        write!(f, "number of equations = {}\n", self.n_equation)?;
        write!(f, "number of active equations = {}\n", self.n_active())?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::EquationPartition;
    use crate::base::Field;
    use russell_lab::Vector;

    #[test]
    fn new_captures_errors() {
        assert_eq!(
            EquationPartition::new(3, vec![(Field::Pressure, vec![0]), (Field::Pressure, vec![1])]).err(),
            Some("a field cannot be given more than once in the partition")
        );
        assert_eq!(
            EquationPartition::new(3, vec![(Field::Displacement, vec![0, 3])]).err(),
            Some("equation number is out of range")
        );
        assert_eq!(
            EquationPartition::new(
                3,
                vec![(Field::Displacement, vec![0, 1]), (Field::Temperature, vec![1, 2])]
            )
            .err(),
            Some("an equation cannot belong to more than one field")
        );
    }

    #[test]
    fn new_works() {
        let partition = EquationPartition::new(
            7,
            vec![
                (Field::Pressure, vec![5, 2]),
                (Field::Displacement, vec![4, 3, 0, 1]),
            ],
        )
        .unwrap();
        assert_eq!(partition.n_equation(), 7);
        assert_eq!(partition.n_active(), 6);
        assert_eq!(partition.equations(Field::Displacement), &[0, 1, 3, 4]);
        assert_eq!(partition.equations(Field::Pressure), &[2, 5]);
        assert_eq!(partition.equations(Field::Temperature).len(), 0);
        assert_eq!(partition.field_of(0), Some(Field::Displacement));
        assert_eq!(partition.field_of(5), Some(Field::Pressure));
        assert_eq!(partition.field_of(6), None);
        assert_eq!(partition.field_of(100), None);
        assert_eq!(partition.active_fields(), &[Field::Displacement, Field::Pressure]);
        assert_eq!(
            format!("{}", partition),
            "Fields: equation numbers\n\
             ========================\n\
             displacement: [0, 1, 3, 4]\n\
             fluid pressure: [2, 5]\n\
             excluded: [6]\n\
             \n\
             Information\n\
             ===========\n\
             number of equations = 7\n\
             number of active equations = 6\n"
        );
    }

    #[test]
    fn single_works() {
        let partition = EquationPartition::single(Field::Temperature, 3);
        assert_eq!(partition.equations(Field::Temperature), &[0, 1, 2]);
        assert_eq!(partition.active_fields(), &[Field::Temperature]);
        assert_eq!(partition.field_of(1), Some(Field::Temperature));
    }

    #[test]
    fn gather_and_norm_work() {
        let partition = EquationPartition::new(
            4,
            vec![(Field::Displacement, vec![0, 2]), (Field::Concentration, vec![3])],
        )
        .unwrap();
        let full = Vector::from(&[1.0, 2.0, 3.0, 4.0]);
        let mut sub = Vector::new(2);
        partition.gather(Field::Displacement, &full, &mut sub).unwrap();
        assert_eq!(sub.as_data(), &[1.0, 3.0]);
        assert_eq!(partition.norm_sq(Field::Displacement, &full), 10.0);
        assert_eq!(partition.norm_sq(Field::Concentration, &full), 16.0);
        assert_eq!(partition.norm_sq(Field::Pressure, &full), 0.0);
        assert_eq!(
            partition.gather(Field::Concentration, &full, &mut sub).err(),
            Some("the sub-vector has an incompatible dimension")
        );
        let wrong = Vector::new(3);
        assert_eq!(
            partition.gather(Field::Displacement, &wrong, &mut sub).err(),
            Some("the global vector has an incompatible dimension")
        );
    }
}
