/// File names of the per-image artifacts in the working directory.
///
/// Indices are 1-based and zero padded to a common width (at least 3 digits),
/// so sorting the names lexically gives frame order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameNaming {
    width: usize,
}

pub const STYLE_FILE: &str = "style.vmd";

impl FrameNaming {
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            width: count.to_string().len().max(3),
        }
    }

    #[must_use]
    pub fn index(&self, index: usize) -> String {
        format!("{index:0width$}", width = self.width)
    }

    #[must_use]
    pub fn poscar(&self, index: usize) -> String {
        format!("image_{}.POSCAR", self.index(index))
    }

    #[must_use]
    pub fn xyz(&self, index: usize) -> String {
        format!("image_{}.xyz", self.index(index))
    }

    #[must_use]
    pub fn render_script(&self, index: usize) -> String {
        format!("render_{}.tcl", self.index(index))
    }

    #[must_use]
    pub fn tga(&self, index: usize) -> String {
        format!("frame_{}.tga", self.index(index))
    }

    #[must_use]
    pub fn png(&self, index: usize) -> String {
        format!("frame_{}.png", self.index(index))
    }

    #[must_use]
    pub fn psi4_input(&self, index: usize) -> String {
        format!("psi4_{}.in", self.index(index))
    }

    #[must_use]
    pub fn psi4_output(&self, index: usize) -> String {
        format!("psi4_{}.out", self.index(index))
    }
}

/// `<basename>-visualize.png` and `<basename>-chart.png` for a trajectory path.
#[must_use]
pub fn output_names(trajectory: &std::path::Path) -> (String, String) {
    let stem = trajectory
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "neb".to_string());
    (format!("{stem}-visualize.png"), format!("{stem}-chart.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_lexical_order_is_frame_order() {
        for count in [1, 9, 11, 150, 1200] {
            let naming = FrameNaming::new(count);
            let names = (1..=count).map(|i| naming.xyz(i)).collect::<Vec<_>>();
            let mut sorted = names.clone();
            sorted.sort();
            assert_eq!(names, sorted, "count {count}");
        }
    }

    #[test]
    fn test_names() {
        let naming = FrameNaming::new(11);
        assert_eq!(naming.poscar(1), "image_001.POSCAR");
        assert_eq!(naming.xyz(11), "image_011.xyz");
        assert_eq!(naming.tga(2), "frame_002.tga");
        assert_eq!(naming.png(2), "frame_002.png");
        assert_eq!(FrameNaming::new(1000).xyz(7), "image_0007.xyz");
    }

    #[test]
    fn test_output_names() {
        assert_eq!(
            output_names(Path::new("/data/run/neb.traj")),
            ("neb-visualize.png".to_string(), "neb-chart.png".to_string())
        );
        assert_eq!(
            output_names(Path::new("path.v2.xyz")).1,
            "path.v2-chart.png".to_string()
        );
    }
}
