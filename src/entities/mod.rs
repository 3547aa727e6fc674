// Entity Models
//
// Administrative units are the only entity the engine resolves against:
// a canonical name is the identity, short codes from source documents are aliases.

pub mod administrative_unit;

pub use administrative_unit::{
    resolve, AdministrativeUnit, AdministrativeUnitsData, NotFound, UnitRegistry, UnitType, STANDARD_ALIASES,
};
