pub(crate) mod lookup;

pub(crate) use lookup::lookup;

use ipapi_lib::Geolocator;

use crate::formatters::result::ResultFormatter;

/// Parameters passed to every command
pub(crate) struct CommandParams {
    pub(crate) geolocator: Geolocator,
    pub(crate) addresses: Vec<String>,
    pub(crate) formatter: Box<dyn ResultFormatter>,
}
