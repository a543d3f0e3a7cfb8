use crate::errors::ValidationError;
use folio_markup::{Element, Node};

/// Largest row or column count accepted by default
pub const MAX_TABLE_SIZE: usize = 20;

const CELL_STYLE: &str = "border: 1px solid #d1d5db; padding: 8px;";
const HEADER_CELL_STYLE: &str =
    "border: 1px solid #d1d5db; padding: 8px; background-color: #f3f4f6; font-weight: bold;";
const TABLE_STYLE: &str = "border-collapse: collapse; width: 100%;";

/// Table requested by the user. With `header_row`, the first of `rows` is
/// the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub rows: usize,
    pub columns: usize,
    pub header_row: bool,
}

impl TableSpec {
    pub fn new(rows: usize, columns: usize, header_row: bool) -> Self {
        Self {
            rows,
            columns,
            header_row,
        }
    }

    /// Parse the command value form `RxC`, optionally followed by `:header`
    pub fn parse(value: &str) -> Option<Self> {
        let (dimensions, flag) = match value.trim().split_once(':') {
            Some((dimensions, flag)) => (dimensions, Some(flag.trim())),
            None => (value.trim(), None),
        };
        let header_row = match flag {
            None => false,
            Some(flag) if flag.eq_ignore_ascii_case("header") => true,
            Some(_) => return None,
        };
        let (rows, columns) = dimensions.split_once(['x', 'X'])?;
        Some(Self::new(
            rows.trim().parse().ok()?,
            columns.trim().parse().ok()?,
            header_row,
        ))
    }

    pub fn validate(&self, max: usize) -> Result<(), ValidationError> {
        let in_range = |n: usize| (1..=max).contains(&n);
        if in_range(self.rows) && in_range(self.columns) {
            Ok(())
        } else {
            Err(ValidationError::TableDimensions {
                rows: self.rows,
                columns: self.columns,
                max,
            })
        }
    }

    /// Build the grid. Output depends only on the spec.
    pub fn to_element(&self) -> Element {
        let mut table = Element::new("table")
            .with_attr("class", "editor-table")
            .with_attr("style", TABLE_STYLE);

        let mut body_rows = self.rows;
        if self.header_row {
            let mut row = Element::new("tr");
            for column in 1..=self.columns {
                row.children.push(
                    Element::new("th")
                        .with_attr("style", HEADER_CELL_STYLE)
                        .with_text(format!("Column {}", column))
                        .into(),
                );
            }
            table.children.push(Element::new("thead").with_child(row).into());
            body_rows = body_rows.saturating_sub(1);
        }

        if body_rows > 0 {
            let mut body = Element::new("tbody");
            for _ in 0..body_rows {
                let mut row = Element::new("tr");
                for _ in 0..self.columns {
                    row.children.push(Node::Element(
                        Element::new("td")
                            .with_attr("style", CELL_STYLE)
                            .with_child(Element::new("br")),
                    ));
                }
                body.children.push(row.into());
            }
            table.children.push(body.into());
        }

        table
    }
}
