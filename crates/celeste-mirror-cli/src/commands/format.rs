use celeste_mirror::{FileCategory, FileDescriptor, Manifest, SyncPlan};

const MAX_NAME_WIDTH: usize = 35;
const LINE_BUDGET: usize = 100;

/// Print the files of each category as `name  url`, grouped by category.
pub fn print_manifest(manifest: &Manifest, only: Option<FileCategory>) {
    let categories: Vec<FileCategory> = match only {
        Some(category) => vec![category],
        None => FileCategory::ALL.to_vec(),
    };

    let mut total = 0usize;
    let mut first = true;

    for category in categories {
        if !first {
            println!();
        }
        first = false;

        let files = manifest.files(category);
        println!("{} ({})", category.display_label(), files.len());
        print_files(files);
        total += files.len();
    }

    println!("\n{total} files");
}

/// Print what a pass would delete and request, per category.
pub fn print_plans(plans: &[SyncPlan]) {
    for plan in plans {
        println!(
            "{}: {} to delete, {} to download",
            plan.category.display_label(),
            plan.to_delete.len(),
            plan.to_download.len()
        );

        for name in &plan.to_delete {
            println!("  - {name}");
        }
        for file in &plan.to_download {
            println!("  + {}", truncate(&file.file_name, MAX_NAME_WIDTH));
        }
    }
}

fn print_files(files: &[FileDescriptor]) {
    let name_width = files
        .iter()
        .map(|f| f.file_name.chars().count())
        .max()
        .unwrap_or(0)
        .min(MAX_NAME_WIDTH);

    let url_budget = LINE_BUDGET.saturating_sub(2 + name_width + 2);

    for file in files {
        let name = truncate(&file.file_name, name_width);
        let url = truncate(&file.download_url, url_budget);
        println!("  {:<width$}  {}", name, url, width = name_width);
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_owned()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(truncate("1.zip", 10), "1.zip");
    }

    #[test]
    fn truncate_marks_cut_strings() {
        assert_eq!(truncate("abcdefgh.zip", 5), "abcd…");
        assert_eq!(truncate("abcdefgh.zip", 5).chars().count(), 5);
    }
}
