use crate::flatten::json_path::{first_text, get_path, joined_text, scalar_text};
use serde::Serialize;
use serde_json::Value;

/// Column headers of the flattened table, in output order
pub const FLAT_COLUMNS: [&str; 23] = [
    "url",
    "price",
    "street",
    "district",
    "latitude",
    "longitude",
    "area",
    "rooms_num",
    "heating",
    "floor_no",
    "building_floors_num",
    "construction_status",
    "rent",
    "deposit",
    "user_type",
    "extras_types",
    "build_year",
    "building_type",
    "building_material",
    "windows_type",
    "equipment_types",
    "security_types",
    "media_types",
];

/// One listing flattened into fixed columns
///
/// Every field except `url` is independently `None` when its source is
/// missing. Field order matches `FLAT_COLUMNS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlatRow {
    pub url: String,
    pub price: Option<String>,
    pub street: Option<String>,
    pub district: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub area: Option<String>,
    pub rooms_num: Option<String>,
    pub heating: Option<String>,
    pub floor_no: Option<String>,
    pub building_floors_num: Option<String>,
    pub construction_status: Option<String>,
    pub rent: Option<String>,
    pub deposit: Option<String>,
    pub user_type: Option<String>,
    pub extras_types: Option<String>,
    pub build_year: Option<String>,
    pub building_type: Option<String>,
    pub building_material: Option<String>,
    pub windows_type: Option<String>,
    pub equipment_types: Option<String>,
    pub security_types: Option<String>,
    pub media_types: Option<String>,
}

/// How a source value is turned into a cell
#[derive(Clone, Copy)]
enum Shape {
    Scalar,
    First,
    Joined,
}

fn cell(listing: &Value, path: &[&str], shape: Shape) -> Option<String> {
    let value = get_path(listing, path)?;
    match shape {
        Shape::Scalar => scalar_text(value),
        Shape::First => first_text(value),
        Shape::Joined => joined_text(value),
    }
}

impl FlatRow {
    /// A row with only the URL set
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Maps a listing object onto the fixed columns
    pub fn from_listing(url: impl Into<String>, listing: &Value) -> Self {
        use Shape::*;

        let target = |key: &str, shape: Shape| cell(listing, &["target", key], shape);

        Self {
            url: url.into(),
            price: target("Price", Scalar),
            street: cell(listing, &["location", "address", "street", "name"], Scalar),
            district: cell(listing, &["location", "address", "district", "name"], Scalar),
            latitude: cell(listing, &["location", "coordinates", "latitude"], Scalar),
            longitude: cell(listing, &["location", "coordinates", "longitude"], Scalar),
            area: target("Area", Scalar),
            rooms_num: target("Rooms_num", First),
            heating: target("Heating", First),
            floor_no: target("Floor_no", First),
            building_floors_num: target("Building_floors_num", Scalar),
            construction_status: target("Construction_status", First),
            rent: target("Rent", Scalar),
            deposit: target("Deposit", Scalar),
            user_type: target("user_type", Scalar),
            extras_types: target("Extras_types", Joined),
            build_year: target("Build_year", Scalar),
            building_type: target("Building_type", First),
            building_material: target("Building_material", First),
            windows_type: target("Windows_type", First),
            equipment_types: target("Equipment_types", Joined),
            security_types: target("Security_types", Joined),
            media_types: target("Media_types", Joined),
        }
    }

    /// True when no field besides the URL was populated
    pub fn is_empty(&self) -> bool {
        *self == Self::empty(self.url.clone())
    }
}
