use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{
    addr::Addr,
    addr_space,
    branch::{self, BranchEdge},
    cart::{Cart, START_ADDR},
    decode::{self, Instruction},
};

/// Everything recovered by one traversal of the ROM's reachable code.
#[derive(Debug, Default)]
pub struct Analysis {
    pub instructions: BTreeMap<Addr, Instruction>,
    /// Branch edges per instruction start; addresses without edges are
    /// sequential code.
    pub edges: BTreeMap<Addr, Vec<BranchEdge>>,
    /// Call targets, i.e. discovered function entry points.
    pub functions: BTreeSet<Addr>,
    /// Reached addresses that failed to decode.
    pub unknown: BTreeSet<Addr>,
}

pub fn analyze(cart: &Cart) -> Analysis {
    analyze_from(cart, START_ADDR)
}

/// Walk the reachable code starting at `entry`, decoding each instruction
/// once and following every statically known branch target.
pub fn analyze_from(cart: &Cart, entry: Addr) -> Analysis {
    let mut analysis = Analysis::default();
    analysis.functions.insert(entry);
    let mut queue = VecDeque::from([entry]);
    while let Some(addr) = queue.pop_front() {
        if analysis.instructions.contains_key(&addr) || analysis.unknown.contains(&addr) {
            continue;
        }
        if !addr_space::is_executable(addr) {
            continue;
        }
        let window: Vec<u8> = (0..3).map_while(|i| cart.read(addr.add(i))).collect();
        let instr = match decode::decode(&window, addr) {
            Ok(instr) => instr,
            Err(err) => {
                log::debug!("traversal stops at {addr}: {err}");
                analysis.unknown.insert(addr);
                continue;
            }
        };
        let edges = branch::resolve(&instr);
        // A conditional pair already carries its fallthrough as one of the
        // two edges; returns and indirect jumps end the path.
        let mut fallthrough = edges.is_empty();
        for edge in &edges {
            match *edge {
                BranchEdge::Call(target) => {
                    analysis.functions.insert(target);
                    queue.push_back(target);
                    fallthrough = true;
                }
                BranchEdge::Unconditional(target)
                | BranchEdge::TrueBranch(target)
                | BranchEdge::FalseBranch(target) => queue.push_back(target),
                BranchEdge::Return | BranchEdge::IndirectUnresolved => {}
            }
        }
        if fallthrough {
            queue.push_back(instr.end());
        }
        if !edges.is_empty() {
            analysis.edges.insert(addr, edges);
        }
        analysis.instructions.insert(addr, instr);
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::rom_image;

    fn cart_with(code: &[(u16, &[u8])]) -> Cart {
        let mut image = rom_image();
        for (addr, bytes) in code {
            image[*addr as usize..*addr as usize + bytes.len()].copy_from_slice(bytes);
        }
        Cart::from_bytes(image).unwrap()
    }

    #[test]
    fn follows_jumps_and_calls() {
        let cart = cart_with(&[
            (0x0100, &[0x00]), // nop
            (0x0101, &[0xc3, 0x50, 0x01]), // jp 0x0150
            (0x0150, &[0xcd, 0x00, 0x02]), // call 0x0200
            (0x0153, &[0xc9]), // ret
            (0x0200, &[0x3e, 0x42]), // ld a,0x42
            (0x0202, &[0xc9]), // ret
        ]);
        let analysis = analyze(&cart);
        for addr in [0x0100u16, 0x0101, 0x0150, 0x0153, 0x0200, 0x0202] {
            assert!(analysis.instructions.contains_key(&Addr::new(addr)), "{addr:04x}");
        }
        // The jump is followed, not fallen through: 0x0104 is never decoded.
        assert!(!analysis.instructions.contains_key(&Addr::new(0x0104)));
        assert_eq!(
            analysis.edges[&Addr::new(0x0101)],
            [BranchEdge::Unconditional(Addr::new(0x0150))]
        );
        assert_eq!(
            analysis.functions,
            BTreeSet::from([START_ADDR, Addr::new(0x0200)])
        );
        assert!(analysis.unknown.is_empty());
    }

    #[test]
    fn conditional_branch_explores_both_sides() {
        let cart = cart_with(&[
            (0x0100, &[0x20, 0x02]), // jr nz,+2 -> 0x0104
            (0x0102, &[0x00]),
            (0x0103, &[0xc9]),
            (0x0104, &[0xc9]),
        ]);
        let analysis = analyze(&cart);
        assert!(analysis.instructions.contains_key(&Addr::new(0x0102)));
        assert!(analysis.instructions.contains_key(&Addr::new(0x0104)));
    }

    #[test]
    fn stops_at_unknown_opcodes() {
        let cart = cart_with(&[
            (0x0100, &[0x00]), // nop
            (0x0101, &[0xd3]), // undefined
        ]);
        let analysis = analyze(&cart);
        assert!(analysis.instructions.contains_key(&Addr::new(0x0100)));
        assert!(analysis.unknown.contains(&Addr::new(0x0101)));
        assert!(!analysis.instructions.contains_key(&Addr::new(0x0102)));
    }

    #[test]
    fn indirect_jump_ends_the_path() {
        let cart = cart_with(&[
            (0x0100, &[0xe9]), // jp (hl)
        ]);
        let analysis = analyze(&cart);
        assert_eq!(analysis.instructions.len(), 1);
        assert_eq!(
            analysis.edges[&Addr::new(0x0100)],
            [BranchEdge::IndirectUnresolved]
        );
    }

    #[test]
    fn decodes_each_address_once() {
        // Tight backwards loop: jr -2 revisits itself.
        let cart = cart_with(&[(0x0100, &[0x18, 0xfe])]);
        let analysis = analyze(&cart);
        assert_eq!(analysis.instructions.len(), 1);
        assert_eq!(
            analysis.edges[&Addr::new(0x0100)],
            [BranchEdge::Unconditional(Addr::new(0x0100))]
        );
    }
}
