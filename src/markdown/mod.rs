pub(crate) mod emit;
pub(crate) mod links;
pub(crate) mod normalize;
pub(crate) mod table;

pub use emit::{EmitStats, Emitter};
pub use links::{audit_image_links, image_targets};
pub use normalize::{Normalizer, normalize};
pub use table::{PipeTableFormatter, PlaceholderTableFormatter, TableFormatter};

use crate::config::TableStyle;

pub(crate) fn table_formatter(style: TableStyle) -> &'static dyn TableFormatter {
    match style {
        TableStyle::Pipe => &PipeTableFormatter,
        TableStyle::Placeholder => &PlaceholderTableFormatter,
    }
}
