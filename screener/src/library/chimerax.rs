//! ChimeraX command scripts (`.cxc`) for the predicted complexes of the
//! winning binders.
//!
//! Scripts either point at the CIF files where the screen wrote them, or at a
//! relocated copy under `{base}/structures` for viewing on another machine.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use crate::helper_functions::files_below;
use crate::library::cdr_library::cdr3_span;
use crate::library::winners::WinningBinder;
use crate::models::Nucleotide;

const IMAGE_SIZE: &str = "width 1200 height 900 supersample 3";

/// Where the scripts expect structures and write their images.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptLayout {
    Local,
    Relocated { base: String },
}

impl ScriptLayout {
    fn suffix(&self) -> &'static str {
        match self {
            ScriptLayout::Local => "",
            ScriptLayout::Relocated { .. } => "_remote",
        }
    }

    fn preset(&self) -> &'static str {
        match self {
            ScriptLayout::Local => r#"preset "Overall Look" publication"#,
            ScriptLayout::Relocated { .. } => r#"preset "Overall Look" "publication 1""#,
        }
    }
}

/// One complex to visualize.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureView {
    pub variant_id: String,
    pub target: Nucleotide,
    pub mutations: String,
    /// Path as it appears in the script.
    pub cif: String,
    /// Path on this machine, when the screen output was found.
    pub source: Option<PathBuf>,
}

impl StructureView {
    fn stem(&self) -> String {
        format!("{}_{}", self.variant_id, self.target)
    }
}

fn prediction_name(variant_id: &str, target: Nucleotide) -> String {
    format!("{variant_id}_vs_{target}")
}

/// `{variant}_vs_{target}_model_0.cif` anywhere below that prediction's output directory.
pub fn find_model_cif(results_dir: &Path, variant_id: &str, target: Nucleotide) -> Option<PathBuf> {
    let name = prediction_name(variant_id, target);
    let wanted = format!("{name}_model_0.cif");
    let mut found: Vec<PathBuf> = files_below(&results_dir.join(&name))
        .into_iter()
        .filter(|p| p.file_name().is_some_and(|f| f == wanted.as_str()))
        .collect();
    found.sort();
    found.into_iter().next()
}

fn cdr3_selection() -> String {
    let (start, end) = cdr3_span();
    format!("/A:{}-{}", start + 1, end)
}

pub fn full_script(view: &StructureView, save_dir: &str, layout: &ScriptLayout) -> String {
    let stem = view.stem();
    let cdr3 = cdr3_selection();
    let save = |suffix: &str| format!("{save_dir}/{stem}_{suffix}");
    let mut out = String::new();

    let _ = writeln!(out, "# ChimeraX visualization script");
    let _ = writeln!(out, "# Variant: {}", view.variant_id);
    let _ = writeln!(out, "# Target: {}", view.target);
    let _ = writeln!(out, "# Mutations: {}", view.mutations);
    let _ = writeln!(out, "# Run with: chimerax {stem}_chimerax{}.cxc\n", layout.suffix());

    let _ = writeln!(out, "open {}\n", view.cif);
    let _ = writeln!(out, "{}\nlighting soft\nset bgColor white\n", layout.preset());
    let _ = writeln!(out, "color /A tan\ncolor /B green");
    let _ = writeln!(out, "hide /A atoms\ncartoon /A");
    let _ = writeln!(out, "show /B atoms\nstyle /B ball\n");

    let _ = writeln!(out, "# CDR3");
    let _ = writeln!(out, "color {cdr3} orange\nshow {cdr3} atoms\nstyle {cdr3} stick\n");

    let _ = writeln!(out, "# binding site, residues within 5A of the ligand");
    let _ = writeln!(out, "select /A & <5 /B\ncolor sel cyan\nshow sel atoms\nstyle sel stick\n~select\n");
    let _ = writeln!(out, "hbonds /A to /B\nhbonds style dashed\nhbonds color yellow\n");

    let _ = writeln!(out, "view\nsave {}\n", save("session.cxs"));
    let _ = writeln!(out, "save {} {IMAGE_SIZE}", save("front.png"));
    let _ = writeln!(out, "turn y 90\nwait 60\nsave {} {IMAGE_SIZE}", save("side.png"));
    let _ = writeln!(out, "turn x 90\nwait 60\nsave {} {IMAGE_SIZE}\n", save("top.png"));

    let _ = writeln!(out, "view /B\ncofr /B\nzoom 0.5\nsave {} {IMAGE_SIZE}\n", save("binding_site.png"));
    let _ = writeln!(out, "view {cdr3} | /B\nzoom 0.7\nsave {} {IMAGE_SIZE}\n", save("CDR3_closeup.png"));
    let _ = writeln!(out, "log save {}", save("log.txt"));
    out
}

pub fn simple_script(view: &StructureView, layout: &ScriptLayout) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Quick ChimeraX viewer");
    let _ = writeln!(out, "# Run with: chimerax {}_simple{}.cxc\n", view.stem(), layout.suffix());
    let _ = writeln!(out, "open {}", view.cif);
    let _ = writeln!(out, "{}", layout.preset());
    let _ = writeln!(out, "color /A wheat\ncolor /B green\nshow /B atoms\nstyle /B ball");
    let _ = writeln!(out, "select /A & <5 /B\ncolor sel cyan\nshow sel atoms\nstyle sel stick");
    let _ = writeln!(out, "hbonds /A to /B\nview");
    out
}

/// Opens every view side by side.
pub fn master_script(views: &[StructureView], layout: &ScriptLayout) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# ChimeraX master script: all winning binders in tile view");
    let _ = writeln!(out, "# Run with: chimerax view_all_binders{}.cxc\n", layout.suffix());
    let _ = writeln!(out, "windowsize 1920 1080\n");
    for (i, view) in views.iter().enumerate() {
        let m = format!("model{}", i + 1);
        let _ = writeln!(out, "# {} ({})", view.variant_id, view.target);
        let _ = writeln!(out, "open {} name {m}", view.cif);
        let _ = writeln!(out, "color {m}/A tan\ncolor {m}/B green");
        let _ = writeln!(out, "show {m}/B atoms\nstyle {m}/B ball");
        let _ = writeln!(out, "select {m}/A & <5 {m}/B\ncolor sel cyan\nshow sel atoms\nstyle sel stick\n~select");
        let _ = writeln!(out, "view {m}\n");
    }
    let _ = writeln!(out, "tile\nlighting soft\nset bgColor white");
    out
}

/// Copy instructions for running relocated scripts on another machine.
pub fn transfer_guide(base: &str, views: &[StructureView], scripts_dir: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Structure transfer guide\n");
    let _ = writeln!(out, "## Directories on the viewing machine\n");
    let _ = writeln!(out, "```bash\nmkdir -p {base}/structures {base}/visualizations {base}/scripts\n```\n");
    let _ = writeln!(out, "## Structures\n");
    for view in views {
        let source = view
            .source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("<not found: {}_model_0.cif>", prediction_name(&view.variant_id, view.target)));
        let _ = writeln!(out, "- {source}\n  -> {}", view.cif);
    }
    let _ = writeln!(out, "\n## Scripts\n");
    let _ = writeln!(out, "All `*_remote.cxc` files in {} -> {base}/scripts/\n", scripts_dir.display());
    let _ = writeln!(out, "```bash");
    let _ = writeln!(out, "rsync -avz <user@host>:{}/ {base}/scripts/", scripts_dir.display());
    let _ = writeln!(out, "chimerax {base}/scripts/view_all_binders_remote.cxc\n```");
    out
}

fn write(path: PathBuf, content: &str, written: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Generated {}", path.display());
    written.push(path);
    Ok(())
}

/// Writes the full and simple script per binder plus the master script.
/// Locally laid out binders without a predicted structure are skipped.
pub fn generate_chimerax_scripts(
    winners: &[WinningBinder],
    results_dir: &Path,
    output_dir: &Path,
    layout: &ScriptLayout,
) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut views = Vec::new();
    for w in winners {
        let source = find_model_cif(results_dir, &w.variant_id, w.nucleotide);
        let cif = match (layout, &source) {
            (ScriptLayout::Relocated { base }, _) => {
                format!("{base}/structures/{}_model_0.cif", prediction_name(&w.variant_id, w.nucleotide))
            }
            (ScriptLayout::Local, Some(path)) => path.display().to_string(),
            (ScriptLayout::Local, None) => {
                warn!("No model_0 structure for {} vs {} in {}", w.variant_id, w.nucleotide, results_dir.display());
                continue;
            }
        };
        views.push(StructureView {
            variant_id: w.variant_id.clone(),
            target: w.nucleotide,
            mutations: w.mutations.clone(),
            cif,
            source,
        });
    }

    let save_dir = match layout {
        ScriptLayout::Local => output_dir.display().to_string(),
        ScriptLayout::Relocated { base } => format!("{base}/visualizations"),
    };
    let suffix = layout.suffix();

    let mut written = Vec::new();
    for view in &views {
        let stem = view.stem();
        write(output_dir.join(format!("{stem}_chimerax{suffix}.cxc")), &full_script(view, &save_dir, layout), &mut written)?;
        write(output_dir.join(format!("{stem}_simple{suffix}.cxc")), &simple_script(view, layout), &mut written)?;
    }
    write(output_dir.join(format!("view_all_binders{suffix}.cxc")), &master_script(&views, layout), &mut written)?;
    if let ScriptLayout::Relocated { base } = layout {
        write(output_dir.join("TRANSFER_GUIDE.md"), &transfer_guide(base, &views, output_dir), &mut written)?;
    }
    info!("Generated {} ChimeraX files for {} binders", written.len(), views.len());
    Ok(written)
}
