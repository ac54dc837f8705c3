pub(crate) mod log;
pub(crate) mod result;

use self::result::ResultFormatter;
use crate::options::OutputFormat;

/// Create a result formatter based on the given format option
pub(crate) fn get_result_formatter(format: OutputFormat) -> Box<dyn ResultFormatter> {
    match format {
        OutputFormat::Json => Box::new(result::Json),
        OutputFormat::Compact => Box::new(result::Compact),
    }
}
