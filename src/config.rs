use crate::reconcile::ReconcileStrategy;

/// How extracted images are named inside the asset directory.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum AssetNaming {
    /// `image_01.png`, `image_02.jpeg`, … in extraction order.
    #[default]
    Sequence,
    /// The media part's own name (`image7.jpeg`), suffixed on collision.
    Original,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum TableStyle {
    /// GFM pipe table, first row as header.
    #[default]
    Pipe,
    /// An opaque marker, for documents whose tables are converted by hand.
    Placeholder,
}

#[derive(Clone, Debug)]
pub struct ConvertOptions {
    /// Asset directory, relative to the output directory. Also used as the
    /// link prefix in the Markdown.
    pub asset_dir: String,
    pub naming: AssetNaming,
    pub strategy: ReconcileStrategy,
    /// Emitted as a level-1 heading before the body.
    pub title: Option<String>,
    /// Markdown file stem. Defaults to the input file stem.
    pub output_name: Option<String>,
    pub convert_legacy_images: bool,
    pub table_style: TableStyle,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            asset_dir: "images".into(),
            naming: AssetNaming::default(),
            strategy: ReconcileStrategy::Positional,
            title: None,
            output_name: None,
            convert_legacy_images: true,
            table_style: TableStyle::default(),
        }
    }
}

impl ConvertOptions {
    pub fn asset_dir(mut self, dir: impl Into<String>) -> Self {
        self.asset_dir = dir.into();
        self
    }

    pub fn naming(mut self, naming: AssetNaming) -> Self {
        self.naming = naming;
        self
    }

    pub fn strategy(mut self, strategy: ReconcileStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    pub fn convert_legacy_images(mut self, enabled: bool) -> Self {
        self.convert_legacy_images = enabled;
        self
    }

    pub fn table_style(mut self, style: TableStyle) -> Self {
        self.table_style = style;
        self
    }

    /// Markdown file name for an input with the given stem, `.md` appended
    /// unless already present.
    pub(crate) fn markdown_file_name(&self, input_stem: &str) -> String {
        let name = self.output_name.as_deref().unwrap_or(input_stem);
        if name.ends_with(".md") {
            name.to_string()
        } else {
            format!("{name}.md")
        }
    }
}
