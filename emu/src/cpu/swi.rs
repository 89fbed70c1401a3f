//! High-level emulation of operating system calls.
//!
//! When enabled, `SWI` numbers found in the table run natively instead of
//! trapping into the guest kernel. Handlers get the guest memory and R0-R3,
//! and write results through the RAM accessors so the high-resolution
//! mirrors stay in step. A `Some` return value is written to R0.
//!
//! The built-in table covers the math folio: 16.16 fixed-point vector and
//! matrix products on row vectors.

use std::collections::BTreeMap;

use tracing::debug;

use crate::cpu::memory::{Memory, RAM_END};

pub type SwiHandler = fn(&mut Memory, [u32; 4]) -> Option<u32>;

pub const MUL_VEC3_MAT33: u32 = 0x5_0000;
pub const MUL_MAT33_MAT33: u32 = 0x5_0001;
pub const MUL_MANY_VEC3_MAT33: u32 = 0x5_0002;
pub const MUL_VEC4_MAT44: u32 = 0x5_0003;
pub const MUL_MAT44_MAT44: u32 = 0x5_0004;
pub const MUL_MANY_VEC4_MAT44: u32 = 0x5_0005;
pub const DOT3: u32 = 0x5_0006;
pub const CROSS3: u32 = 0x5_0007;

pub struct SwiTable(BTreeMap<u32, SwiHandler>);

impl Default for SwiTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.register(MUL_VEC3_MAT33, mul_vec3_mat33);
        table.register(MUL_MAT33_MAT33, mul_mat33_mat33);
        table.register(MUL_MANY_VEC3_MAT33, mul_many_vec3_mat33);
        table.register(MUL_VEC4_MAT44, mul_vec4_mat44);
        table.register(MUL_MAT44_MAT44, mul_mat44_mat44);
        table.register(MUL_MANY_VEC4_MAT44, mul_many_vec4_mat44);
        table.register(DOT3, dot3);
        table.register(CROSS3, cross3);
        table
    }
}

impl SwiTable {
    #[must_use]
    pub const fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn register(&mut self, number: u32, handler: SwiHandler) {
        self.0.insert(number & 0xF_FFFF, handler);
    }

    /// Handler for the low 20 bits of `comment`, if any.
    #[must_use]
    pub fn lookup(&self, comment: u32) -> Option<SwiHandler> {
        self.0.get(&(comment & 0xF_FFFF)).copied()
    }

    pub fn numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.keys().copied()
    }
}

/// `address` if a whole aligned word there lies inside CPU-visible RAM.
fn in_ram(address: u32) -> Option<u32> {
    (address & 3 == 0 && address.checked_add(4)? <= RAM_END).then_some(address)
}

fn read_fixed(ram: &Memory, address: u32) -> Option<i64> {
    let word = ram.read_ram_word(in_ram(address)?);
    Some(i64::from(word as i32))
}

fn write_fixed(ram: &mut Memory, address: u32, value: i64) -> Option<()> {
    ram.write_ram_word(in_ram(address)?, value as i32 as u32);
    Some(())
}

/// Reads `N` consecutive 16.16 values.
fn read_vector<const N: usize>(ram: &Memory, address: u32) -> Option<[i64; N]> {
    let mut vector = [0; N];
    for (i, value) in (0u32..).zip(vector.iter_mut()) {
        *value = read_fixed(ram, address.wrapping_add(i * 4))?;
    }
    Some(vector)
}

fn write_vector<const N: usize>(ram: &mut Memory, address: u32, vector: [i64; N]) -> Option<()> {
    for (i, value) in (0u32..).zip(vector) {
        write_fixed(ram, address.wrapping_add(i * 4), value)?;
    }
    Some(())
}

/// Row vector times an `N`x`N` row-major matrix.
fn vec_mat<const N: usize>(ram: &Memory, vector: u32, matrix: u32) -> Option<[i64; N]> {
    let v = read_vector::<N>(ram, vector)?;
    let mut out = [0; N];
    for (col, out) in (0u32..).zip(out.iter_mut()) {
        let mut sum = 0;
        for (row, x) in (0u32..).zip(v) {
            sum += x * read_fixed(ram, matrix.wrapping_add((row * N as u32 + col) * 4))?;
        }
        *out = sum >> 16;
    }
    Some(out)
}

fn mul_many<const N: usize>(ram: &mut Memory, [dest, src, matrix, count]: [u32; 4]) -> Option<()> {
    let stride = N as u32 * 4;
    for i in 0..count {
        let out = vec_mat::<N>(ram, src.wrapping_add(i * stride), matrix)?;
        write_vector(ram, dest.wrapping_add(i * stride), out)?;
    }
    Some(())
}

fn mat_mat<const N: usize>(ram: &mut Memory, [dest, left, right, _]: [u32; 4]) -> Option<()> {
    // Each row of the product is a row of `left` times `right`. Compute all
    // of them first so `dest` may alias an input.
    let stride = N as u32 * 4;
    let mut rows = Vec::with_capacity(N);
    for row in 0..N as u32 {
        rows.push(vec_mat::<N>(ram, left.wrapping_add(row * stride), right)?);
    }
    for (row, out) in (0u32..).zip(rows) {
        write_vector(ram, dest.wrapping_add(row * stride), out)?;
    }
    Some(())
}

fn report(name: &str, done: Option<()>) {
    if done.is_none() {
        debug!(name, "math call used an unaligned address or one outside RAM");
    }
}

fn mul_vec3_mat33(ram: &mut Memory, [dest, vector, matrix, _]: [u32; 4]) -> Option<u32> {
    report("MulVec3Mat33", mul_many::<3>(ram, [dest, vector, matrix, 1]));
    None
}

fn mul_mat33_mat33(ram: &mut Memory, args: [u32; 4]) -> Option<u32> {
    report("MulMat33Mat33", mat_mat::<3>(ram, args));
    None
}

fn mul_many_vec3_mat33(ram: &mut Memory, args: [u32; 4]) -> Option<u32> {
    report("MulManyVec3Mat33", mul_many::<3>(ram, args));
    None
}

fn mul_vec4_mat44(ram: &mut Memory, [dest, vector, matrix, _]: [u32; 4]) -> Option<u32> {
    report("MulVec4Mat44", mul_many::<4>(ram, [dest, vector, matrix, 1]));
    None
}

fn mul_mat44_mat44(ram: &mut Memory, args: [u32; 4]) -> Option<u32> {
    report("MulMat44Mat44", mat_mat::<4>(ram, args));
    None
}

fn mul_many_vec4_mat44(ram: &mut Memory, args: [u32; 4]) -> Option<u32> {
    report("MulManyVec4Mat44", mul_many::<4>(ram, args));
    None
}

fn dot3(ram: &mut Memory, [left, right, _, _]: [u32; 4]) -> Option<u32> {
    let a = read_vector::<3>(ram, left);
    let b = read_vector::<3>(ram, right);
    let (Some(a), Some(b)) = (a, b) else {
        report("Dot3", None);
        return Some(0);
    };
    let sum: i64 = a.iter().zip(b).map(|(a, b)| a * b).sum();
    Some((sum >> 16) as u32)
}

fn cross(ram: &mut Memory, dest: u32, left: u32, right: u32) -> Option<()> {
    let [ax, ay, az] = read_vector::<3>(ram, left)?;
    let [bx, by, bz] = read_vector::<3>(ram, right)?;
    let product = [
        (ay * bz - az * by) >> 16,
        (az * bx - ax * bz) >> 16,
        (ax * by - ay * bx) >> 16,
    ];
    write_vector(ram, dest, product)
}

fn cross3(ram: &mut Memory, [dest, left, right, _]: [u32; 4]) -> Option<u32> {
    report("Cross3", cross(ram, dest, left, right));
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::memory::VRAM_START;
    use pretty_assertions::assert_eq;

    const ONE: i32 = 0x1_0000;

    fn store(ram: &mut Memory, address: u32, values: &[i32]) {
        for (i, value) in (0u32..).zip(values) {
            ram.write_ram_word(address + i * 4, *value as u32);
        }
    }

    fn load(ram: &Memory, address: u32, count: u32) -> Vec<i32> {
        (0..count)
            .map(|i| ram.read_ram_word(address + i * 4) as i32)
            .collect()
    }

    fn call(ram: &mut Memory, number: u32, args: [u32; 4]) -> Option<u32> {
        let handler = SwiTable::default().lookup(number).unwrap();
        handler(ram, args)
    }

    #[test]
    fn check_table_contents() {
        let table = SwiTable::default();
        assert_eq!(table.numbers().count(), 8);
        assert!(table.lookup(0xEF05_0006).is_some());
        assert!(table.lookup(0x5_0008).is_none());
        assert!(SwiTable::empty().lookup(DOT3).is_none());
    }

    #[test]
    fn check_vec3_times_matrix() {
        let mut ram = Memory::default();
        store(&mut ram, 0x100, &[ONE, 2 * ONE, 3 * ONE]);
        // Rows: x -> (0, 1, 0), y -> (1, 0, 0), z -> (0, 0, 2)
        store(&mut ram, 0x200, &[0, ONE, 0, ONE, 0, 0, 0, 0, 2 * ONE]);
        assert_eq!(call(&mut ram, MUL_VEC3_MAT33, [0x300, 0x100, 0x200, 0]), None);
        assert_eq!(load(&ram, 0x300, 3), vec![2 * ONE, ONE, 6 * ONE]);
    }

    #[test]
    fn check_many_vec4() {
        let mut ram = Memory::default();
        store(&mut ram, 0x100, &[ONE, 0, 0, 0, 0, 0, 0, ONE]);
        let identity_times_two = [
            2 * ONE, 0, 0, 0, 0, 2 * ONE, 0, 0, 0, 0, 2 * ONE, 0, 0, 0, 0, 2 * ONE,
        ];
        store(&mut ram, 0x200, &identity_times_two);
        call(&mut ram, MUL_MANY_VEC4_MAT44, [0x300, 0x100, 0x200, 2]);
        assert_eq!(load(&ram, 0x300, 8), vec![2 * ONE, 0, 0, 0, 0, 0, 0, 2 * ONE]);
    }

    #[test]
    fn check_matrix_product_in_place() {
        let mut ram = Memory::default();
        let m = [ONE, ONE, 0, 0, ONE, 0, 0, 0, ONE];
        store(&mut ram, 0x100, &m);
        call(&mut ram, MUL_MAT33_MAT33, [0x100, 0x100, 0x100, 0]);
        assert_eq!(load(&ram, 0x100, 9), vec![ONE, 2 * ONE, 0, 0, ONE, 0, 0, 0, ONE]);
    }

    #[test]
    fn check_dot_and_cross() {
        let mut ram = Memory::default();
        store(&mut ram, 0x100, &[ONE, 0, 0]);
        store(&mut ram, 0x110, &[0, ONE, 0]);
        store(&mut ram, 0x120, &[ONE / 2, 4 * ONE, 0]);
        assert_eq!(call(&mut ram, DOT3, [0x100, 0x110, 0, 0]), Some(0));
        assert_eq!(call(&mut ram, DOT3, [0x110, 0x120, 0, 0]), Some(4 * ONE as u32));

        call(&mut ram, CROSS3, [0x200, 0x100, 0x110, 0]);
        assert_eq!(load(&ram, 0x200, 3), vec![0, 0, ONE]);
    }

    #[test]
    fn check_results_reach_hires_mirrors() {
        let mut ram = Memory::default();
        ram.set_high_resolution(true);
        store(&mut ram, 0x100, &[ONE, 0, 0]);
        store(&mut ram, 0x110, &[0, ONE, 0]);

        let dest = VRAM_START + 0x40;
        call(&mut ram, CROSS3, [dest, 0x100, 0x110, 0]);
        assert_eq!(load(&ram, dest, 3), vec![0, 0, ONE]);
        for page in 0..3 {
            let mirror = ram.hires_page(page).unwrap();
            assert_eq!(&mirror[0x48..0x4C], &ONE.to_be_bytes());
        }
    }

    #[test]
    fn check_out_of_range_is_ignored() {
        let mut ram = Memory::default();
        assert_eq!(call(&mut ram, MUL_VEC3_MAT33, [0, RAM_END - 4, 0x100, 0]), None);
        assert_eq!(call(&mut ram, DOT3, [0xFFFF_FFFC, 0, 0, 0]), Some(0));
        assert_eq!(call(&mut ram, DOT3, [0x102, 0x100, 0, 0]), Some(0));
        assert_eq!(ram.read_ram_word(0), 0);
    }
}
