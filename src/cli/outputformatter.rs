use crate::recipes::{AdminOverview, Dashboard, Recipe};

const MAX_COL_WIDTH: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Table column: header text and how body cells are aligned.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub title: &'static str,
    pub align: Align,
}

const fn col(title: &'static str, align: Align) -> Column {
    Column { title, align }
}

const RECIPE_COLUMNS: [Column; 5] = [
    col("id", Align::Left),
    col("title", Align::Left),
    col("category", Align::Left),
    col("minutes", Align::Right),
    col("created by", Align::Left),
];

const CATEGORY_COLUMNS: [Column; 1] = [col("category", Align::Left)];

/// Render rows as an ASCII table; returns an empty string when there are no rows.
/// Headers are always left aligned, body cells follow their column.
pub fn render_table(columns: &[Column], rows: &[Vec<String>]) -> String {
    if rows.is_empty() { return String::new(); }
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|cell| cell.chars().count())
                .fold(c.title.chars().count(), usize::max)
                .min(MAX_COL_WIDTH)
        })
        .collect();
    let rule = format!("+{}+", widths.iter().map(|w| "-".repeat(w + 2)).collect::<Vec<_>>().join("+"));
    let header: Vec<String> = columns.iter().map(|c| c.title.to_string()).collect();

    let mut out = vec![rule.clone(), table_line(columns, &header, &widths, true), rule.clone()];
    out.extend(rows.iter().map(|r| table_line(columns, r, &widths, false)));
    out.push(rule);
    out.join("\n")
}

fn table_line(columns: &[Column], cells: &[String], widths: &[usize], header: bool) -> String {
    let parts: Vec<String> = columns
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (c, &w))| {
            let text = clip(cells.get(i).map(String::as_str).unwrap_or(""), w);
            match (header, c.align) {
                (false, Align::Right) => format!(" {:>w$} ", text),
                _ => format!(" {:<w$} ", text),
            }
        })
        .collect();
    format!("|{}|", parts.join("|"))
}

/// Cut `s` to `max` characters, marking the cut with an ellipsis.
fn clip(s: &str, max: usize) -> String {
    if s.chars().nth(max).is_none() {
        return s.to_string();
    }
    let mut kept: String = s.chars().take(max.saturating_sub(1)).collect();
    kept.push('…');
    kept
}

pub fn recipe_table(recipes: &[Recipe]) -> String {
    if recipes.is_empty() { return "No recipes found".to_string(); }
    let rows: Vec<Vec<String>> = recipes
        .iter()
        .map(|r| vec![
            r.id.clone(),
            r.title.clone(),
            r.category.clone(),
            r.cooking_time.map(|m| m.to_string()).unwrap_or_default(),
            r.created_by.clone().unwrap_or_default(),
        ])
        .collect();
    let mut s = render_table(&RECIPE_COLUMNS, &rows);
    s.push_str(&format!("\nrecipes: {}", recipes.len()));
    s
}

pub fn recipe_detail(r: &Recipe, editable: bool) -> String {
    let mut lines = vec![
        format!("{} ({})", r.title, r.id),
        format!("category: {}", if r.category.is_empty() { "-" } else { r.category.as_str() }),
        format!("cooking time: {}", r.cooking_time.map(|m| format!("{} min", m)).unwrap_or_else(|| "-".into())),
    ];
    if let Some(by) = &r.created_by {
        lines.push(format!("created by: {}", by));
    }
    lines.push("ingredients:".into());
    for i in &r.ingredients {
        lines.push(format!("  - {}", i));
    }
    lines.push("instructions:".into());
    lines.push(format!("  {}", r.instructions));
    if editable {
        lines.push(format!("actions: update {0} | delete {0}", r.id));
    }
    lines.join("\n")
}

pub fn category_list(categories: &[String]) -> String {
    if categories.is_empty() { return "No categories found".to_string(); }
    let rows: Vec<Vec<String>> = categories.iter().map(|c| vec![c.clone()]).collect();
    render_table(&CATEGORY_COLUMNS, &rows)
}

fn count_or_error<T>(v: &crate::error::ClientResult<T>, count: impl Fn(&T) -> usize) -> String {
    match v {
        Ok(x) => count(x).to_string(),
        Err(e) => format!("error: {}", e),
    }
}

pub fn dashboard(d: &Dashboard) -> String {
    let mut out = vec![
        format!("total recipes: {}", count_or_error(&d.all, Vec::len)),
        format!("my recipes:    {}", count_or_error(&d.mine, Vec::len)),
        format!("categories:    {}", count_or_error(&d.categories, Vec::len)),
        String::new(),
        "recent recipes:".to_string(),
    ];
    let recent = d.recent();
    if recent.is_empty() {
        out.push("No recipes found".to_string());
    } else {
        for r in recent {
            out.push(format!("  {}  {}  [{}]", r.id, r.title, r.category));
        }
    }
    out.join("\n")
}

pub fn admin_overview(a: &AdminOverview) -> String {
    format!(
        "total recipes: {}\ncategories:    {}",
        count_or_error(&a.total_recipes, |n| *n),
        count_or_error(&a.categories, |n| *n)
    )
}
