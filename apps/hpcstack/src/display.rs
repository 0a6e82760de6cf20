//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use hpcstack_ops::{
    BuildStatus, ConflictsReport, DepGraphReport, DryRunReport, HierarchyReport, MappingReport,
    ObtainReport, OperationResult, ResolveReport, SearchReport, TweakReport, VersionPick,
};
use hpcstack_types::ColorChoice;
use std::io;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render operation result
    pub fn render_result(&self, result: &OperationResult) -> io::Result<()> {
        if self.json_output {
            self.render_json(result)
        } else {
            self.render_table(result)
        }
    }

    /// Render as JSON
    fn render_json(&self, result: &OperationResult) -> io::Result<()> {
        let json = result.to_json().map_err(io::Error::other)?;
        println!("{json}");
        Ok(())
    }

    /// Render as formatted table
    fn render_table(&self, result: &OperationResult) -> io::Result<()> {
        match result {
            OperationResult::BuildOrder(report) => self.render_build_order(report),
            OperationResult::DryRun(report) => self.render_dry_run(report),
            OperationResult::Conflicts(report) => self.render_conflicts(report),
            OperationResult::Hierarchy(report) => self.render_hierarchy(report),
            OperationResult::Mapping(report) => self.render_mapping(report),
            OperationResult::SearchResults(report) => self.render_search_results(report),
            OperationResult::VersionPick(pick) => self.render_version_pick(pick),
            OperationResult::Tweak(report) => self.render_tweak_report(report),
            OperationResult::Obtain(report) => self.render_obtain(report),
            OperationResult::DepGraph(report) => self.render_dep_graph(report),
            OperationResult::Success(message) => self.render_success_message(message),
        }
    }

    fn table(headers: &[&str]) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
        table
    }

    /// Render the build order
    fn render_build_order(&self, report: &ResolveReport) -> io::Result<()> {
        if report.order.is_empty() {
            println!("Nothing to build.");
            return Ok(());
        }

        let mut table = Self::table(&["#", "Module", "Easyconfig"]);
        for (index, module) in report.order.iter().enumerate() {
            let spec = module
                .spec
                .as_ref()
                .map_or_else(|| "(installed, no easyconfig)".to_string(), |p| p.display().to_string());
            let name_cell = if module.placeholder {
                self.colored_cell(&module.module, Color::Yellow)
            } else {
                Cell::new(&module.module)
            };
            table.add_row(vec![Cell::new(index + 1), name_cell, Cell::new(spec)]);
        }
        println!("{table}");

        if report.placeholders > 0 {
            println!(
                "{} installed module(s) without an easyconfig were kept in the plan.",
                report.placeholders
            );
        }
        Ok(())
    }

    /// Render the dry-run overview, colouring the status markers
    fn render_dry_run(&self, report: &DryRunReport) -> io::Result<()> {
        if !self.supports_color() {
            println!("{}", report.render());
            return Ok(());
        }

        println!("{}", report.heading);
        if let Some(prefix) = &report.common_prefix {
            println!("{}={prefix}", hpcstack_ops::SHORT_PREFIX_VAR);
        }
        for item in &report.items {
            let style = match item.status {
                BuildStatus::Missing => Style::new().yellow(),
                BuildStatus::Available => Style::new().green(),
                BuildStatus::Forced | BuildStatus::Rebuild => Style::new().cyan(),
            };
            println!(
                " * [{}] {} (module: {})",
                style.apply_to(item.status.marker()),
                item.path,
                item.module
            );
        }
        Ok(())
    }

    fn render_conflicts(&self, report: &ConflictsReport) -> io::Result<()> {
        if !report.conflicts_found {
            println!(
                "{} No conflicts found among {} easyconfig(s).",
                self.styled("[OK]", Style::new().green()),
                report.report.nodes
            );
            return Ok(());
        }

        println!(
            "{} {} conflict(s) found:",
            self.styled("[CONFLICT]", Style::new().red().bold()),
            report.report.conflicts.len()
        );
        for message in report.report.messages() {
            println!("  - {message}");
        }
        Ok(())
    }

    fn render_hierarchy(&self, report: &HierarchyReport) -> io::Result<()> {
        println!("Toolchain hierarchy of {}", self.styled(&report.toolchain, Style::new().bold()));
        let mut table = Self::table(&["Level", "Toolchain", "Family", "Capabilities"]);
        for (index, level) in report.levels.iter().enumerate() {
            let capabilities: Vec<String> = level
                .capabilities
                .provided()
                .map(|cap| {
                    let family = level.capabilities.get(cap).unwrap_or("-");
                    format!("{}={family}", cap.as_str())
                })
                .collect();
            table.add_row(vec![
                Cell::new(index),
                Cell::new(level.to_string()),
                Cell::new(level.comp_family.as_deref().unwrap_or("-")),
                Cell::new(if capabilities.is_empty() {
                    "-".to_string()
                } else {
                    capabilities.join(", ")
                }),
            ]);
        }
        println!("{table}");
        Ok(())
    }

    fn render_mapping(&self, report: &MappingReport) -> io::Result<()> {
        println!("Mapping {} onto {}", report.source, report.target);
        let mut table = Self::table(&["Source", "Target"]);
        for (source, target) in &report.mapping.toolchains {
            table.add_row(vec![Cell::new(source), Cell::new(target.to_string())]);
        }
        println!("{table}");

        for (package, paired) in &report.mapping.carry_over {
            println!(
                "Carried over: {package} {}{} ({})",
                paired.version, paired.versionsuffix, paired.toolchain
            );
        }
        Ok(())
    }

    fn render_search_results(&self, report: &SearchReport) -> io::Result<()> {
        if report.paths.is_empty() {
            println!("No easyconfigs match '{}'.", report.query);
            return Ok(());
        }
        for path in &report.paths {
            println!(" * {}", path.display());
        }
        println!();
        println!("Found {} easyconfig(s).", report.paths.len());
        Ok(())
    }

    fn render_version_pick(&self, pick: &VersionPick) -> io::Result<()> {
        println!(
            "{} {} ({})",
            pick.name,
            self.styled(&pick.selected, Style::new().green().bold()),
            pick.toolchain
        );
        if let Some(required) = &pick.required {
            println!("Required:  {required}");
        }
        println!("Available: {}", pick.available.join(", "));
        Ok(())
    }

    fn render_tweak_report(&self, report: &TweakReport) -> io::Result<()> {
        println!("Moving {} to {}", report.source, report.target);
        for (from, to) in &report.suffixes {
            println!("  versionsuffix {from} -> {to}");
        }

        let mut table = Self::table(&["Original", "Tweaked", "File"]);
        for record in &report.records {
            let file = record
                .written_to
                .as_ref()
                .map_or_else(|| record.file_name.clone(), |p| p.display().to_string());
            table.add_row(vec![
                Cell::new(&record.original),
                Cell::new(&record.module),
                Cell::new(file),
            ]);
        }
        println!("{table}");
        Ok(())
    }

    fn render_obtain(&self, report: &ObtainReport) -> io::Result<()> {
        if report.generated {
            println!(
                "Generated {} from {}",
                self.styled(&report.file_name, Style::new().green().bold()),
                report.template.display()
            );
        } else {
            println!(
                "Found {} at {}",
                self.styled(&report.module, Style::new().green().bold()),
                report.template.display()
            );
        }
        if let Some(path) = &report.written_to {
            println!("Written to {}", path.display());
        }
        Ok(())
    }

    fn render_dep_graph(&self, report: &DepGraphReport) -> io::Result<()> {
        println!(
            "Wrote dependency graph with {} node(s) and {} edge(s) to {}",
            report.nodes,
            report.edges,
            report.path.display()
        );
        Ok(())
    }

    fn render_success_message(&self, message: &str) -> io::Result<()> {
        println!("{}", self.styled(message, Style::new().green()));
        Ok(())
    }

    fn colored_cell(&self, text: &str, color: Color) -> Cell {
        if self.supports_color() {
            Cell::new(text).fg(color)
        } else {
            Cell::new(text)
        }
    }

    fn styled(&self, text: &str, style: Style) -> String {
        if self.supports_color() {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Check if colors are supported
    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}
