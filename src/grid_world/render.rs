//! Text views of values and policies laid over the grid.

use std::fmt::Write;

use super::GridWorld;
use crate::error::{MdpError, Result};
use crate::mdp::Mdp;

const POLICY_SYMBOLS: [char; 5] = ['↑', '→', '↓', '←', '@'];

impl GridWorld {
    /// Values of one treasure layer as a table, impassable cells shown as `#`.
    ///
    /// `values` is indexed by state id and may carry one extra trailing entry
    /// (the terminal state of the transition matrices).
    pub fn render_values(&self, hash: usize, values: &[f64]) -> Result<String> {
        let n = self.num_states();
        if values.len() != n && values.len() != n + 1 {
            return Err(MdpError::dimension_mismatch(
                format!("{} or {} values", n, n + 1),
                format!("{} values", values.len()),
            ));
        }
        if hash >= self.layer_count() {
            return Err(MdpError::invalid_parameter(
                "hash".to_string(),
                format!("layer {} does not exist ({} layers)", hash, self.layer_count()),
            ));
        }

        let mut out = String::new();
        for y in 0..self.height() {
            for x in 0..self.width() {
                match self.state_at(hash, x, y) {
                    Some(s) => {
                        let _ = write!(out, "{:>9.3}", values[s]);
                    }
                    None => {
                        let _ = write!(out, "{:>9}", "#");
                    }
                }
            }
            out.push('\n');
        }
        Ok(out)
    }

    /// Every layer of a policy: arrows for moves, `@` for the treasure
    /// action, the tile character for terminal and impassable cells.
    pub fn render_policy(&self, policy: &[usize]) -> String {
        let mut out = String::new();
        for hash in 0..self.layer_count() {
            let _ = writeln!(out, "layer {}", hash);
            for y in 0..self.height() {
                for x in 0..self.width() {
                    let symbol = match self.state_at(hash, x, y) {
                        None => '#',
                        Some(s) if self.is_terminal(s) => self.tile(s).kind.to_char(),
                        Some(s) => policy
                            .get(s)
                            .and_then(|&a| POLICY_SYMBOLS.get(a))
                            .copied()
                            .unwrap_or('?'),
                    };
                    out.push(symbol);
                }
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::config::WorldConfig;
    use crate::grid_world::GridWorld;
    use crate::mdp::Mdp;

    #[test]
    fn test_render_policy_marks_terrain() {
        let world = GridWorld::parse("3,2\nSOG\n#OU\n", &WorldConfig::default()).unwrap();
        let policy = vec![1; world.num_states()];
        let text = world.render_policy(&policy);
        assert_eq!(text, "layer 0\n→→G\n#→U\n");
    }

    #[test]
    fn test_render_values_checks_length() {
        let world = GridWorld::parse("2,1\nSG\n", &WorldConfig::default()).unwrap();
        assert!(world.render_values(0, &[1.0]).is_err());
        assert!(world.render_values(1, &[1.0, 2.0]).is_err());
        let text = world.render_values(0, &[1.5, 10.0, 0.0]).unwrap();
        assert_eq!(text, "    1.500   10.000\n");
    }
}
