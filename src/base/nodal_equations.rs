use super::{EquationPartition, Field};
use crate::StrError;
use gemlab::mesh::{CellAttribute, Mesh, PointId};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Holds the global equation numbers of every (point, field, component) triple
///
/// The displacement field has `ndim` components per point; all other fields are scalars.
///
/// # Examples
///
/// ```text
///            {pl → 8}  [#] indicates id
///            {ux → 6}  (#) indicates attribute
///            {uy → 7}  {#} indicates equation number
///                2
///               / \
///              /   \
///             / [0] \
///            /  (1)  \
/// {ux → 0}  /         \  {ux → 3}
/// {uy → 1} 0-----------1 {uy → 4}
/// {pl → 2}               {pl → 5}
/// ```
///
/// ```
/// use gemlab::mesh::Samples;
/// use qnsolve::base::{Field, NodalEquations};
/// use qnsolve::StrError;
/// use std::collections::HashMap;
///
/// fn main() -> Result<(), StrError> {
///     let mesh = Samples::one_tri3();
///     let fields = HashMap::from([(1, vec![Field::Displacement, Field::Pressure])]);
///     let nodal = NodalEquations::new(&mesh, &fields, &[(0, Field::Pressure)])?;
///     assert_eq!(nodal.n_equation(), 9);
///     assert_eq!(nodal.eq(2, Field::Pressure, 0)?, 8);
///     assert_eq!(nodal.locate(7), Some((2, Field::Displacement, 1)));
///     let partition = nodal.partition()?;
///     assert_eq!(partition.equations(Field::Pressure), &[5, 8]);
///     Ok(())
/// }
/// ```
pub struct NodalEquations {
    /// Holds the space dimension
    ndim: usize,

    /// Holds the equation numbers of each field at each point
    ///
    /// (npoint)
    points: Vec<HashMap<Field, Vec<usize>>>,

    /// Holds the (point, field, component) triple of each equation
    ///
    /// (n_equation)
    reverse: Vec<(PointId, Field, usize)>,

    /// Indicates whether an equation is prescribed (excluded from the partition) or not
    ///
    /// (n_equation)
    prescribed: Vec<bool>,
}

impl NodalEquations {
    /// Allocates a new instance
    ///
    /// # Input
    ///
    /// * `mesh` -- the mesh
    /// * `fields` -- the fields of the cells with a given attribute
    /// * `prescribed` -- the (point, field) pairs with prescribed values (all components)
    pub fn new(
        mesh: &Mesh,
        fields: &HashMap<CellAttribute, Vec<Field>>,
        prescribed: &[(PointId, Field)],
    ) -> Result<Self, StrError> {
        // collect the fields at each point
        let npoint = mesh.points.len();
        let mut memo_point_fields = vec![BTreeSet::new(); npoint];
        for cell in &mesh.cells {
            let cell_fields = fields
                .get(&cell.attribute)
                .ok_or("cannot find CellAttribute in the map of fields")?;
            for p in &cell.points {
                for field in cell_fields {
                    memo_point_fields[*p].insert(*field);
                }
            }
        }

        // number the equations point by point (the set yields the fields sorted)
        let mut points = vec![HashMap::new(); npoint];
        let mut reverse = Vec::new();
        for point_id in 0..npoint {
            for field in &memo_point_fields[point_id] {
                let ncomp = if *field == Field::Displacement { mesh.ndim } else { 1 };
                let mut eqs = Vec::with_capacity(ncomp);
                for comp in 0..ncomp {
                    eqs.push(reverse.len());
                    reverse.push((point_id, *field, comp));
                }
                points[point_id].insert(*field, eqs);
            }
        }

        // flag the prescribed equations
        let mut flags = vec![false; reverse.len()];
        for (point_id, field) in prescribed {
            if *point_id >= npoint {
                return Err("prescribed point id is out of range");
            }
            let eqs = points[*point_id]
                .get(field)
                .ok_or("cannot prescribe a field that does not exist at the point")?;
            for eq in eqs {
                flags[*eq] = true;
            }
        }
        Ok(NodalEquations {
            ndim: mesh.ndim,
            points,
            reverse,
            prescribed: flags,
        })
    }

    /// Returns the total number of equations (including the prescribed ones)
    #[inline]
    pub fn n_equation(&self) -> usize {
        self.reverse.len()
    }

    /// Returns the space dimension
    #[inline]
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    /// Returns the equation number of a (point, field, component) triple
    pub fn eq(&self, point_id: PointId, field: Field, comp: usize) -> Result<usize, StrError> {
        let at_point = self.points.get(point_id).ok_or("point id is out of range")?;
        let eqs = at_point.get(&field).ok_or("field does not exist at the point")?;
        eqs.get(comp).copied().ok_or("component index is out of range")
    }

    /// Returns the (point, field, component) triple of an equation
    ///
    /// This reverse mapping is used to report reactions at prescribed equations.
    pub fn locate(&self, eq: usize) -> Option<(PointId, Field, usize)> {
        self.reverse.get(eq).copied()
    }

    /// Returns whether an equation is prescribed or not
    pub fn is_prescribed(&self, eq: usize) -> bool {
        self.prescribed.get(eq).copied().unwrap_or(false)
    }

    /// Returns the prescribed equations (sorted)
    pub fn prescribed_equations(&self) -> Vec<usize> {
        (0..self.n_equation()).filter(|eq| self.prescribed[*eq]).collect()
    }

    /// Builds the partition of the active (non-prescribed) equations into fields
    pub fn partition(&self) -> Result<EquationPartition, StrError> {
        let mut sets: Vec<(Field, Vec<usize>)> = Vec::new();
        for field in Field::ALL {
            let eqs: Vec<_> = (0..self.n_equation())
                .filter(|eq| self.reverse[*eq].1 == field && !self.prescribed[*eq])
                .collect();
            if eqs.len() > 0 {
                sets.push((field, eqs));
            }
        }
        EquationPartition::new(self.n_equation(), sets)
    }
}

impl fmt::Display for NodalEquations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Points: fields and equation numbers\n")?;
        write!(f, "===================================\n")?;
        for (point_id, at_point) in self.points.iter().enumerate() {
            let pairs: Vec<_> = Field::ALL
                .iter()
                .filter_map(|field| at_point.get(field).map(|eqs| (field.name(), eqs)))
                .collect();
            write!(f, "{}: {:?}\n", point_id, pairs)?;
        }
        write!(f, "\nInformation\n")?;
        write!(f, "===========\n")?;
        write!(f, "number of equations = {}\n", self.n_equation())?;
        write!(f, "prescribed equations = {:?}\n", self.prescribed_equations())?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::NodalEquations;
    use crate::base::Field;
    use gemlab::mesh::Samples;
    use std::collections::HashMap;

    #[test]
    fn new_captures_errors() {
        let mesh = Samples::one_tri3();
        let fields = HashMap::from([(2, vec![Field::Temperature])]);
        assert_eq!(
            NodalEquations::new(&mesh, &fields, &[]).err(),
            Some("cannot find CellAttribute in the map of fields")
        );
        let fields = HashMap::from([(1, vec![Field::Temperature])]);
        assert_eq!(
            NodalEquations::new(&mesh, &fields, &[(3, Field::Temperature)]).err(),
            Some("prescribed point id is out of range")
        );
        assert_eq!(
            NodalEquations::new(&mesh, &fields, &[(0, Field::Pressure)]).err(),
            Some("cannot prescribe a field that does not exist at the point")
        );
    }

    #[test]
    fn new_works_single_field() {
        //       {4} 4---.__
        //          / \     `--.___3 {3}  [#] indicates id
        //         /   \          / \     (#) indicates attribute
        //        /     \  [1]   /   \    {#} indicates equation number
        //       /  [0]  \ (1)  / [2] \
        //      /   (1)   \    /  (1)  \
        // {0} 0---.__     \  /      ___2 {2}
        //            `--.__\/__.---'
        //               {1} 1
        let mesh = Samples::three_tri3();
        let fields = HashMap::from([(1, vec![Field::Temperature])]);
        let nodal = NodalEquations::new(&mesh, &fields, &[(0, Field::Temperature), (4, Field::Temperature)]).unwrap();
        assert_eq!(nodal.n_equation(), 5);
        assert_eq!(nodal.ndim(), 2);
        assert_eq!(nodal.eq(3, Field::Temperature, 0), Ok(3));
        assert_eq!(nodal.prescribed_equations(), &[0, 4]);
        assert_eq!(nodal.is_prescribed(4), true);
        assert_eq!(nodal.is_prescribed(2), false);
        let partition = nodal.partition().unwrap();
        assert_eq!(partition.equations(Field::Temperature), &[1, 2, 3]);
        assert_eq!(partition.field_of(0), None);
        assert_eq!(
            format!("{}", nodal),
            "Points: fields and equation numbers\n\
             ===================================\n\
             0: [(\"temperature\", [0])]\n\
             1: [(\"temperature\", [1])]\n\
             2: [(\"temperature\", [2])]\n\
             3: [(\"temperature\", [3])]\n\
             4: [(\"temperature\", [4])]\n\
             \n\
             Information\n\
             ===========\n\
             number of equations = 5\n\
             prescribed equations = [0, 4]\n"
        );
    }

    #[test]
    fn new_works_two_fields() {
        let mesh = Samples::one_tri3();
        let fields = HashMap::from([(1, vec![Field::Pressure, Field::Displacement])]);
        let nodal = NodalEquations::new(&mesh, &fields, &[(1, Field::Displacement)]).unwrap();
        assert_eq!(nodal.n_equation(), 9);
        assert_eq!(nodal.eq(0, Field::Displacement, 0), Ok(0));
        assert_eq!(nodal.eq(0, Field::Displacement, 1), Ok(1));
        assert_eq!(nodal.eq(0, Field::Pressure, 0), Ok(2));
        assert_eq!(nodal.eq(1, Field::Displacement, 0), Ok(3));
        assert_eq!(nodal.eq(2, Field::Pressure, 0), Ok(8));
        assert_eq!(nodal.eq(2, Field::Pressure, 1).err(), Some("component index is out of range"));
        assert_eq!(nodal.eq(2, Field::Temperature, 0).err(), Some("field does not exist at the point"));
        assert_eq!(nodal.eq(5, Field::Pressure, 0).err(), Some("point id is out of range"));
        assert_eq!(nodal.locate(4), Some((1, Field::Displacement, 1)));
        assert_eq!(nodal.locate(5), Some((1, Field::Pressure, 0)));
        assert_eq!(nodal.locate(9), None);
        let partition = nodal.partition().unwrap();
        assert_eq!(partition.equations(Field::Displacement), &[0, 1, 6, 7]);
        assert_eq!(partition.equations(Field::Pressure), &[2, 5, 8]);
        assert_eq!(partition.n_active(), 7);
    }
}
