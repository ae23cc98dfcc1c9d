//! Optogenetic fusion constructs: a light-sensing domain inserted into a
//! nanobody loop between two flexible linkers.
//!
//! Catcher sensors extend that layout with a C-terminal readout fragment, so
//! every nucleotide gets its own wavelength and reporter pairing.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context};
use serde::Serialize;
use tracing::{info, warn};

use crate::library::cdr_library::cdr3_span;
use crate::library::winners::WinningBinder;
use crate::models::Nucleotide;

pub const DEFAULT_LINKER: &str = "GSGSGSG";

/// 0-indexed insertion site in the loop after framework 3 residue 74.
pub const DEFAULT_INSERTION_POS: usize = 74;

const FASTA_LINE_WIDTH: usize = 80;
const AMINO_ACIDS: &str = "ACDEFGHIKLMNPQRSTVWY";

const LOV2_SEQUENCE: &str = "\
    MADEFDVMLKLIGRHGNVYSATLSEMDIEAGKLYAMSHGYEPPTELVKLLEANYDIPVVGTDNQFLVVGSGVSGRISYVA\
    RYFNKSVAKVVKDNGNHDLAVKALELEYNKSHNPQIVKKYVAIVGSEFVDAIYESLASRTHFTVTGQIHNQVTRSYFKNK\
    DSILLSAAGLFTNTQIQAAFKILNVPTDVPYKEVAFYTPGDEVRYEGAIFKDIRKLGNKTSFVGKPYDMYGKVATDEPLE\
    VSNIVVSEDGETWTFHGESGRLVVPRKTSVEDYITYDIRAIGEDAERLVLSGTEVVLHLLAQIPVFKLPPPAAGPSLERV\
    MQEIPRGQVPLNLTDTEEKARRWFDRVREAEEEIRKLGAGFGKRN";

const CRY2_SEQUENCE: &str = "\
    MSQLWLQECPEFFRAFSYKYQQDVNKIFPGGYGGLHPYSNLIGGRCSQVIEALEKGKYQMLGGDGWKRAIVFTQRKGERG\
    PRKLVDDEEAVRRGDVFLNHPDIDPSLMKPGRGVLLPEMAQRMLKSAGIDAEYRVVDGAHVEPGVQFLASWREGHCRLSV\
    ETAKLGEDGDYRRNLFGLLDSPEIHALHRYWQQVMPRPSLRTGGSMLVLPVLLLGLYLLPRHRPSSGSRTSMSSSQSSLK\
    HSRSRSSADTTNRTRCLQTQTQSFSAALSNSQKQKQTQKQRREALILLLREVLRKLRQEQEERLLQEVRERKARLWDRVR\
    GEEEDLRRLGRGFGRQV";

const BPHP1_SEQUENCE: &str = "\
    MRGSHHHHHHGMASMTGGQQMGRDLYDDDDKDPAVDGGGSGGSGGSGGSGGSLVPRGSHMFEKKVFFSTDNGHYISRELT\
    DPGLFARVEGSKAATGRHLVSGSIAGSLMPEELQGAGTDYQVALVDIEALLKHAPVAGADLDPTLTRAMQHGDEVMDAIV\
    NLTGDRSGKPNLPMFWPNQYYNYDPYQSHLLVGQYQAQSKADQALSALGTLTNYRIINQGGFHGDWRDMTRMNPFFGRNF\
    GLSHYQGELLKHFAFEQMGIHPMGQPHQLDIPTNLAQLGFEFHHFPVFGDVMGQAAERQRLVRLAQRGFSVPASMQPHAW\
    NNAEGHMLLEQAGGLGGALRRYLSEFVPFEDLASRVAALGGFFLRQMGDVLAQEGDKVVFLGSGAIGLAIFKALVTVAAK\
    AGLPARLLVYREGLLGEFGLAKEWQQRGQSGAVFTDAGRIYFLLKKGNDWLRHLMAMGKPTAQKAVQKAMEIFPLVFAYF\
    EGTGGFRAAKKAVASAATAHKLSQEILDLGGSSLPSKVKLLSAARGYATPPRLGSKVGDLQDFLVKLGVGGFGRVFLVLL\
    LGEGLVGGQAEVIYLHSHNPFYFTGLSSLAAALFVGDRPIEALRTQLQRAGLDAKPVLIAECAFGKLREELGYTDTVKKT\
    LTLEEVEEMVAAATVAGL";

const DRONPA_SEQUENCE: &str = "\
    MRGSHHHHHHGMASMASKGEELFTGVVPILVELDGDVNGHKFSVRGEGEGDATNGKLTLKFICTTGKLPVPWPTLVTTLT\
    YGVQCFARYPDHMKQHDFFKSAMPEGYVQERTISFKDDGTYKTRAEVKFEGDTLVNRIELKGIDFKEDGNILGHKLEYNF\
    NSHNVYITADKQKNGIKANFKIRHNVEDGSVQLADHYQQNTPIGDGPVLLPDNHYLSTQSVLSKDPNEKRDHMVLLEFVT\
    AAGITHGMDELYK";

const BICYCL_RED_SEQUENCE: &str = "\
    MVSKGEELFTGVVPILVELDGDVNGHKFSVSGEGEGDATYGKLTLKFICTTGKLPVPWPTLVTTFSYGVQCFSRYPDHMK\
    QHDFFKSAMPEGYVQERTIFFKDDGNYKTRAEVKFEGDTLVNRIELKGIDFKEDGNILGHKLEYNYNSHNVYIMADKQKN\
    GIKVNFKIRHNIEDGSVQLADHYQQNTPIGDGPVLLPDNHYLSTQSALSKDPNEKRDHMVLLEFVTAAGITLGMDELYK";

const PHYB_SEQUENCE: &str = "\
    MGSSSHHHHHHSSGLVPRGSHMSMAASELFTAFDIPESLTDPSFFRELAQHTSRVDSIPPELIPAFLEFFRAQGLGKVVR\
    LTSNDPQDLSVITGGGVVGLESYTRAIGGNGMRLVFHGVEANPLVFWPGDEDVLSQALVDALEQRGFTVPSSWFPHQYSK\
    FDEIHLRQKGYQWHVLGKSPQALDIVPSGLSPELRSLTGMAFHTPGLVGYSVGQALERLVSLARRGFDPLWLPQYPLGPG\
    AATARLQGFEQIFPRVERELAPLASRAPQALLAPEASPRLAVRGLSYTPQRAIPLPYGDFWAAKLASAATGRLLATPSQV\
    DAAAALLAQTGSLAGRWRAAAEAEGASPLPMAGGPLAERLQQLGLTLRGPAAHRLRLPHTRSAATLRLGAMELDIVVADL\
    ADVRPTELAPFPTPWQLATAPVLPPSQQRLDDYLRRMGLA";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptoDomain {
    Lov2,
    Cry2,
    BphP1,
    Dronpa,
    BicyclRed,
    PhyB,
}

impl OptoDomain {
    pub const ALL: [OptoDomain; 6] = [
        OptoDomain::Lov2,
        OptoDomain::Cry2,
        OptoDomain::BphP1,
        OptoDomain::Dronpa,
        OptoDomain::BicyclRed,
        OptoDomain::PhyB,
    ];

    /// Domains built by `chimeras` when none are requested.
    pub const INSERTION_SET: [OptoDomain; 3] = [OptoDomain::Lov2, OptoDomain::Cry2, OptoDomain::BphP1];

    pub fn name(self) -> &'static str {
        match self {
            OptoDomain::Lov2 => "LOV2",
            OptoDomain::Cry2 => "CRY2",
            OptoDomain::BphP1 => "BphP1",
            OptoDomain::Dronpa => "Dronpa",
            OptoDomain::BicyclRed => "BICYCL_Red",
            OptoDomain::PhyB => "PhyB",
        }
    }

    pub fn sequence(self) -> &'static str {
        match self {
            OptoDomain::Lov2 => LOV2_SEQUENCE,
            OptoDomain::Cry2 => CRY2_SEQUENCE,
            OptoDomain::BphP1 => BPHP1_SEQUENCE,
            OptoDomain::Dronpa => DRONPA_SEQUENCE,
            OptoDomain::BicyclRed => BICYCL_RED_SEQUENCE,
            OptoDomain::PhyB => PHYB_SEQUENCE,
        }
    }
}

impl fmt::Display for OptoDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OptoDomain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OptoDomain::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = OptoDomain::ALL.iter().map(|d| d.name()).collect();
                anyhow::anyhow!("Unknown optogenetic domain: {} ({})", s, known.join(", "))
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chimera {
    pub domain: OptoDomain,
    pub insertion_position: usize,
    pub linker: String,
    pub before_segment: String,
    pub after_segment: String,
    pub full_sequence: String,
}

impl Chimera {
    pub fn nanobody_length(&self) -> usize {
        self.before_segment.len() + self.after_segment.len()
    }

    pub fn domain_length(&self) -> usize {
        self.domain.sequence().len()
    }

    pub fn chimeric_length(&self) -> usize {
        self.full_sequence.len()
    }
}

/// Uppercases, strips whitespace and rejects anything that is not one of the
/// 20 standard amino acids.
pub fn normalize_sequence(raw: &str) -> anyhow::Result<String> {
    let sequence: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if let Some(bad) = sequence.chars().find(|c| !AMINO_ACIDS.contains(*c)) {
        bail!("Invalid amino acid character '{}' in sequence", bad);
    }
    Ok(sequence)
}

/// `before + linker + domain + linker + after`, split at `position`.
pub fn insert_domain(
    nanobody_seq: &str,
    domain: OptoDomain,
    position: usize,
    linker: &str,
) -> anyhow::Result<Chimera> {
    if position > nanobody_seq.len() || !nanobody_seq.is_char_boundary(position) {
        bail!("Position {} out of range (0-{})", position, nanobody_seq.len());
    }
    let (before, after) = nanobody_seq.split_at(position);
    Ok(Chimera {
        domain,
        insertion_position: position,
        linker: linker.to_string(),
        before_segment: before.to_string(),
        after_segment: after.to_string(),
        full_sequence: format!("{before}{linker}{}{linker}{after}", domain.sequence()),
    })
}

fn wrapped(out: &mut String, sequence: &str) {
    // sequences are ASCII after normalize_sequence
    for line in sequence.as_bytes().chunks(FASTA_LINE_WIDTH) {
        let _ = writeln!(out, "{}", String::from_utf8_lossy(line));
    }
}

pub fn chimeras_fasta(chimeras: &[Chimera], name: &str) -> String {
    let mut out = String::new();
    for c in chimeras {
        let _ = writeln!(
            out,
            ">{}_{}_chimera pos={} length={}",
            c.domain,
            name,
            c.insertion_position,
            c.chimeric_length()
        );
        wrapped(&mut out, &c.full_sequence);
        let _ = writeln!(out);
    }
    out
}

pub fn chimeras_report(chimeras: &[Chimera]) -> String {
    let rule = "=".repeat(80);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}\nOPTOGENETIC NANOBODY CHIMERAS - DETAILED REPORT\n{rule}\n");
    for c in chimeras {
        let _ = writeln!(out, "\n{rule}\nDOMAIN: {}\n{rule}\n", c.domain);
        let _ = writeln!(out, "Insertion Position: {}", c.insertion_position);
        let _ = writeln!(out, "Linker: {}", c.linker);
        let _ = writeln!(out, "Nanobody Length: {} aa", c.nanobody_length());
        let _ = writeln!(out, "Domain Length: {} aa", c.domain_length());
        let _ = writeln!(out, "Chimeric Length: {} aa\n", c.chimeric_length());

        let _ = writeln!(out, "Construct Architecture:");
        let _ = writeln!(out, "  N-term (1-{}): {} aa", c.insertion_position, c.before_segment.len());
        let _ = writeln!(out, "  Linker: {} aa", c.linker.len());
        let _ = writeln!(out, "  {}: {} aa", c.domain, c.domain_length());
        let _ = writeln!(out, "  Linker: {} aa", c.linker.len());
        let _ = writeln!(out, "  C-term: {} aa\n", c.after_segment.len());

        let _ = writeln!(out, "Full Sequence:");
        wrapped(&mut out, &c.full_sequence);
        let _ = writeln!(out);
    }
    out
}

/// Builds one chimera per requested domain and writes the FASTA and report
/// into `output_dir`.
pub fn build_chimeras(
    sequence: &str,
    domains: &[OptoDomain],
    position: usize,
    linker: &str,
    name: &str,
    output_dir: &Path,
) -> anyhow::Result<Vec<Chimera>> {
    let sequence = normalize_sequence(sequence)?;
    let linker = normalize_sequence(linker)?;
    let chimeras = domains
        .iter()
        .map(|&d| insert_domain(&sequence, d, position, &linker))
        .collect::<anyhow::Result<Vec<_>>>()?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let fasta_file = output_dir.join("optogenetic_nanobody_chimeras.fasta");
    std::fs::write(&fasta_file, chimeras_fasta(&chimeras, name))
        .with_context(|| format!("Failed to write {}", fasta_file.display()))?;
    info!("Saved FASTA file: {}", fasta_file.display());

    let report_file = output_dir.join("chimera_report.txt");
    std::fs::write(&report_file, chimeras_report(&chimeras))
        .with_context(|| format!("Failed to write {}", report_file.display()))?;
    info!("Saved report: {}", report_file.display());

    for c in &chimeras {
        info!("  - {}: {} aa", c.domain, c.chimeric_length());
    }
    Ok(chimeras)
}

// ── catcher sensors ─────────────────────────────────────────────────────────

/// Linker between the C-terminus of the nanobody and the catcher fragment.
pub const CATCHER_LINKER: &str = "GGGGS";

/// Split-fluorescent-protein fragments used as readouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Catcher {
    A,
    T,
    G,
    C,
}

impl Catcher {
    pub fn name(self) -> &'static str {
        match self {
            Catcher::A => "A_Catcher",
            Catcher::T => "T_Catcher",
            Catcher::G => "G_Catcher",
            Catcher::C => "C_Catcher",
        }
    }

    /// sfGFP11 for A/T, an mCherry11-like strand for G/C.
    pub fn default_sequence(self) -> &'static str {
        match self {
            Catcher::A | Catcher::T => "RDHMVLHEYVNAAGIT",
            Catcher::G | Catcher::C => "RDHMVLLEFVTAAGIT",
        }
    }
}

impl fmt::Display for Catcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorPairing {
    pub nucleotide: Nucleotide,
    pub domain: OptoDomain,
    pub catcher: Catcher,
    pub excitation: &'static str,
    pub emission: &'static str,
}

/// One spectrally separated domain and catcher per nucleotide.
pub const SENSOR_PAIRINGS: [SensorPairing; 4] = [
    SensorPairing {
        nucleotide: Nucleotide::DAtp,
        domain: OptoDomain::Dronpa,
        catcher: Catcher::A,
        excitation: "500nm (cyan)",
        emission: "515nm (green)",
    },
    SensorPairing {
        nucleotide: Nucleotide::DGtp,
        domain: OptoDomain::PhyB,
        catcher: Catcher::G,
        excitation: "660nm (red)",
        emission: "730nm (far-red)",
    },
    SensorPairing {
        nucleotide: Nucleotide::DCtp,
        domain: OptoDomain::BphP1,
        catcher: Catcher::C,
        excitation: "750nm (far-red)",
        emission: "650nm (red)",
    },
    SensorPairing {
        nucleotide: Nucleotide::DTtp,
        domain: OptoDomain::BicyclRed,
        catcher: Catcher::T,
        excitation: "580nm (yellow)",
        emission: "520nm (green)",
    },
];

pub fn sensor_pairing(nucleotide: Nucleotide) -> &'static SensorPairing {
    &SENSOR_PAIRINGS[nucleotide.index()]
}

/// A 1-based, inclusive span of a construct, colored for structure viewers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Construct {
    pub name: String,
    pub nucleotide: Nucleotide,
    pub sequence: String,
    pub regions: Vec<Region>,
}

/// Appends `len` residues starting after the last region; empty segments are skipped.
fn push_region(regions: &mut Vec<Region>, name: &str, len: usize, color: &'static str) {
    if len == 0 {
        return;
    }
    let start = regions.last().map_or(1, |r| r.end + 1);
    regions.push(Region { name: name.to_string(), start, end: start + len - 1, color });
}

/// CDR3 of the binder in construct coordinates, shifted past an insertion
/// that lies in front of it.
fn cdr3_region(binder_len: usize, position: usize, inserted_len: usize) -> Option<Region> {
    let (start, end) = cdr3_span();
    if end > binder_len {
        return None;
    }
    let shift = if start >= position { inserted_len } else { 0 };
    Some(Region { name: "cdr3".to_string(), start: start + shift + 1, end: end + shift, color: "red" })
}

/// `N-term + linker + domain + linker + C-term + GGGGS + catcher`.
pub fn insert_domain_with_catcher(
    nanobody_seq: &str,
    domain: OptoDomain,
    catcher_seq: &str,
    position: usize,
    linker: &str,
) -> anyhow::Result<(String, Vec<Region>)> {
    let chimera = insert_domain(nanobody_seq, domain, position, linker)?;
    let sequence = format!("{}{CATCHER_LINKER}{catcher_seq}", chimera.full_sequence);

    let mut regions = Vec::new();
    push_region(&mut regions, "nanobody_n", chimera.before_segment.len(), "cyan");
    push_region(&mut regions, "linker1", linker.len(), "gray");
    push_region(&mut regions, domain.name(), chimera.domain_length(), "orange");
    push_region(&mut regions, "linker2", linker.len(), "gray");
    push_region(&mut regions, "nanobody_c", chimera.after_segment.len(), "cyan");
    push_region(&mut regions, "linker3", CATCHER_LINKER.len(), "gray");
    push_region(&mut regions, "catcher", catcher_seq.len(), "green");
    regions.extend(cdr3_region(nanobody_seq.len(), position, chimera.domain_length() + 2 * linker.len()));
    Ok((sequence, regions))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorSet {
    pub pairing: SensorPairing,
    pub variant_id: String,
    /// binder + domain + catcher
    pub sensor: Construct,
    /// binder + domain, no readout
    pub basic: Construct,
    /// binder + catcher, constitutive
    pub control: Construct,
}

fn write_fasta(path: &Path, header: &str, sequence: &str) -> anyhow::Result<()> {
    let mut out = format!(">{header}\n");
    wrapped(&mut out, sequence);
    std::fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))
}

/// Builds the sensor, basic chimera and control for one winning binder.
pub fn build_sensor_set(binder: &WinningBinder, position: usize, linker: &str) -> anyhow::Result<SensorSet> {
    let pairing = *sensor_pairing(binder.nucleotide);
    let sequence = normalize_sequence(&binder.sequence)?;
    let catcher_seq = pairing.catcher.default_sequence();
    let nucleotide = binder.nucleotide;

    let (sensor_seq, sensor_regions) =
        insert_domain_with_catcher(&sequence, pairing.domain, catcher_seq, position, linker)?;

    let basic = insert_domain(&sequence, pairing.domain, position, linker)?;
    let mut basic_regions = Vec::new();
    push_region(&mut basic_regions, "nanobody_n", basic.before_segment.len(), "cyan");
    push_region(&mut basic_regions, "linker1", linker.len(), "gray");
    push_region(&mut basic_regions, pairing.domain.name(), basic.domain_length(), "orange");
    push_region(&mut basic_regions, "linker2", linker.len(), "gray");
    push_region(&mut basic_regions, "nanobody_c", basic.after_segment.len(), "cyan");
    basic_regions.extend(cdr3_region(sequence.len(), position, basic.domain_length() + 2 * linker.len()));

    let mut control_regions = Vec::new();
    push_region(&mut control_regions, "nanobody", sequence.len(), "cyan");
    push_region(&mut control_regions, "linker3", CATCHER_LINKER.len(), "gray");
    push_region(&mut control_regions, "catcher", catcher_seq.len(), "green");
    control_regions.extend(cdr3_region(sequence.len(), sequence.len(), 0));

    Ok(SensorSet {
        pairing,
        variant_id: binder.variant_id.clone(),
        sensor: Construct {
            name: format!("{}_{}_{}_sensor", nucleotide, pairing.domain, pairing.catcher),
            nucleotide,
            sequence: sensor_seq,
            regions: sensor_regions,
        },
        basic: Construct {
            name: format!("{}_{}_basic", nucleotide, pairing.domain),
            nucleotide,
            sequence: basic.full_sequence,
            regions: basic_regions,
        },
        control: Construct {
            name: format!("{}_{}_control", nucleotide, pairing.catcher),
            nucleotide,
            sequence: format!("{sequence}{CATCHER_LINKER}{catcher_seq}"),
            regions: control_regions,
        },
    })
}

/// Writes one FASTA per construct (sensor, basic, control) for every binder
/// and returns the sets together with the written paths.
pub fn build_catcher_sensors(
    binders: &[WinningBinder],
    position: usize,
    linker: &str,
    output_dir: &Path,
) -> anyhow::Result<(Vec<SensorSet>, Vec<PathBuf>)> {
    let linker = normalize_sequence(linker)?;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    if binders.is_empty() {
        warn!("No winning binders to build sensors from");
    }

    let mut sets = Vec::with_capacity(binders.len());
    let mut files = Vec::with_capacity(binders.len() * 3);
    for binder in binders {
        let set = build_sensor_set(binder, position, &linker)?;
        info!("{} sensor from {}", set.pairing.nucleotide, set.variant_id);
        info!("  Domain: {} ({} aa)", set.pairing.domain, set.pairing.domain.sequence().len());
        info!("  Catcher: {} ({} aa)", set.pairing.catcher, set.pairing.catcher.default_sequence().len());
        info!("  Excitation: {}  Emission: {}", set.pairing.excitation, set.pairing.emission);
        info!("  Total: {} aa", set.sensor.sequence.len());

        for (construct, header) in [
            (&set.sensor, set.sensor.name.clone()),
            (&set.basic, set.basic.name.clone()),
            (&set.control, format!("{} (constitutive)", set.control.name)),
        ] {
            let path = output_dir.join(format!("{}.fasta", construct.name));
            write_fasta(&path, &header, &construct.sequence)?;
            files.push(path);
        }
        sets.push(set);
    }
    info!("Saved {} constructs in {}", files.len(), output_dir.display());
    Ok((sets, files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::cdr_library::BASE_NANOBODY;

    #[test]
    fn domain_lengths() {
        assert_eq!(OptoDomain::Lov2.sequence().len(), 365);
        assert_eq!(OptoDomain::Cry2.sequence().len(), 337);
        assert_eq!(OptoDomain::BphP1.sequence().len(), 658);
        assert_eq!(OptoDomain::Dronpa.sequence().len(), 253);
        assert_eq!(OptoDomain::BicyclRed.sequence().len(), 239);
        assert_eq!(OptoDomain::PhyB.sequence().len(), 440);
        assert_eq!("bphp1".parse::<OptoDomain>().unwrap(), OptoDomain::BphP1);
        assert_eq!("bicycl_red".parse::<OptoDomain>().unwrap(), OptoDomain::BicyclRed);
        assert!("GFP".parse::<OptoDomain>().is_err());
        for d in OptoDomain::ALL {
            assert!(normalize_sequence(d.sequence()).is_ok(), "{d}");
        }
    }

    #[test]
    fn insertion_layout() {
        let c = insert_domain(BASE_NANOBODY, OptoDomain::Lov2, DEFAULT_INSERTION_POS, DEFAULT_LINKER).unwrap();
        assert_eq!(c.before_segment.len(), 74);
        assert_eq!(c.nanobody_length(), BASE_NANOBODY.len());
        assert_eq!(c.chimeric_length(), BASE_NANOBODY.len() + 365 + 2 * 7);
        assert!(c.full_sequence.starts_with(&format!("{}GSGSGSGMADEF", &BASE_NANOBODY[..74])));
        assert!(c.full_sequence.ends_with(&format!("GFGKRNGSGSGSG{}", &BASE_NANOBODY[74..])));
    }

    #[test]
    fn ends_are_valid_positions() {
        assert!(insert_domain("QVQL", OptoDomain::Cry2, 0, "GS").unwrap().full_sequence.starts_with("GSMSQ"));
        let tail = insert_domain("QVQL", OptoDomain::Cry2, 4, "GS").unwrap();
        assert!(tail.full_sequence.starts_with("QVQLGSMSQ"));
        assert!(tail.after_segment.is_empty());
        assert!(insert_domain("QVQL", OptoDomain::Cry2, 5, "GS").is_err());
    }

    #[test]
    fn rejects_non_amino_acids() {
        assert_eq!(normalize_sequence(" qvql\nves ").unwrap(), "QVQLVES");
        assert!(normalize_sequence("QVQLX").is_err());
    }

    #[test]
    fn fasta_wraps_at_80_columns() {
        let c = insert_domain(BASE_NANOBODY, OptoDomain::Cry2, 74, DEFAULT_LINKER).unwrap();
        let fasta = chimeras_fasta(&[c.clone()], "nanobody");
        let mut lines = fasta.lines();
        assert_eq!(
            lines.next().unwrap(),
            format!(">CRY2_nanobody_chimera pos=74 length={}", c.chimeric_length())
        );
        let body: Vec<&str> = lines.take_while(|l| !l.is_empty()).collect();
        assert!(body.iter().all(|l| l.len() <= 80));
        assert_eq!(body.concat(), c.full_sequence);
    }

    #[test]
    fn writes_fasta_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let chimeras = build_chimeras(BASE_NANOBODY, &OptoDomain::INSERTION_SET, 74, "gsgsgsg", "nanobody", dir.path()).unwrap();
        assert_eq!(chimeras.len(), 3);
        assert_eq!(chimeras[0].linker, "GSGSGSG");
        let fasta = std::fs::read_to_string(dir.path().join("optogenetic_nanobody_chimeras.fasta")).unwrap();
        assert_eq!(fasta.matches('>').count(), 3);
        let report = std::fs::read_to_string(dir.path().join("chimera_report.txt")).unwrap();
        assert!(report.contains("DOMAIN: BphP1"));
        assert!(report.contains("  N-term (1-74): 74 aa"));
    }

    fn binder(nucleotide: Nucleotide) -> WinningBinder {
        WinningBinder {
            variant_id: format!("{nucleotide}_variant_007"),
            nucleotide,
            mutations: "S99T".to_string(),
            sequence: BASE_NANOBODY.to_string(),
            combined_score: 1.0,
        }
    }

    #[test]
    fn every_nucleotide_has_a_distinct_pairing() {
        for n in Nucleotide::ALL {
            assert_eq!(sensor_pairing(n).nucleotide, n);
        }
        let domains: Vec<OptoDomain> = SENSOR_PAIRINGS.iter().map(|p| p.domain).collect();
        assert_eq!(
            domains,
            vec![OptoDomain::Dronpa, OptoDomain::PhyB, OptoDomain::BphP1, OptoDomain::BicyclRed]
        );
    }

    #[test]
    fn catcher_layout_and_regions() {
        let (seq, regions) =
            insert_domain_with_catcher(BASE_NANOBODY, OptoDomain::Dronpa, "RDHMVLHEYVNAAGIT", 74, DEFAULT_LINKER)
                .unwrap();
        assert_eq!(seq.len(), BASE_NANOBODY.len() + 253 + 2 * 7 + 5 + 16);
        assert!(seq.ends_with(&format!("{}GGGGSRDHMVLHEYVNAAGIT", &BASE_NANOBODY[74..])));

        let names: Vec<&str> = regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["nanobody_n", "linker1", "Dronpa", "linker2", "nanobody_c", "linker3", "catcher", "cdr3"]
        );
        assert_eq!((regions[0].start, regions[0].end), (1, 74));
        assert_eq!((regions[2].start, regions[2].end), (82, 334));
        assert_eq!(regions[6].end, seq.len());

        // CDR3 sits behind the insertion, shifted by the domain and both linkers
        let cdr3 = &regions[7];
        assert_eq!((cdr3.start, cdr3.end), (96 + 267, 102 + 267));
        assert_eq!(&seq[cdr3.start - 1..cdr3.end], &BASE_NANOBODY[95..102]);
    }

    #[test]
    fn sensor_set_has_three_constructs() {
        let set = build_sensor_set(&binder(Nucleotide::DTtp), 74, DEFAULT_LINKER).unwrap();
        assert_eq!(set.sensor.name, "dTTP_BICYCL_Red_T_Catcher_sensor");
        assert_eq!(set.basic.name, "dTTP_BICYCL_Red_basic");
        assert_eq!(set.control.name, "dTTP_T_Catcher_control");
        assert!(!set.basic.sequence.ends_with(CATCHER_LINKER));
        assert_eq!(set.control.sequence, format!("{BASE_NANOBODY}GGGGSRDHMVLHEYVNAAGIT"));
        let cdr3 = set.control.regions.iter().find(|r| r.name == "cdr3").unwrap();
        assert_eq!((cdr3.start, cdr3.end), (96, 102));
    }

    #[test]
    fn writes_sensor_fastas() {
        let dir = tempfile::tempdir().unwrap();
        let binders: Vec<WinningBinder> = Nucleotide::ALL.into_iter().map(binder).collect();
        let (sets, files) = build_catcher_sensors(&binders, 74, DEFAULT_LINKER, dir.path()).unwrap();
        assert_eq!(sets.len(), 4);
        assert_eq!(files.len(), 12);
        assert!(files.iter().all(|f| f.exists()));

        let control = std::fs::read_to_string(dir.path().join("dGTP_G_Catcher_control.fasta")).unwrap();
        assert!(control.starts_with(">dGTP_G_Catcher_control (constitutive)\n"));
        let body: String = control.lines().skip(1).collect();
        assert!(body.ends_with("GGGGSRDHMVLLEFVTAAGIT"));
    }
}
