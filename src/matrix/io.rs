//! Чтение и запись матриц в текстовом формате
//!
//! Формат совместим с `fscanf("%d")`: целые числа, разделенные любыми
//! пробельными символами. Раскладка построчная, читается ровно `size²`
//! значений, все последующее содержимое файла игнорируется.

use anyhow::{bail, ensure, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Читает квадратную матрицу порядка `size` из файла
pub fn read_matrix(path: &Path, size: usize) -> Result<Vec<i32>> {
    let file =
        File::open(path).with_context(|| format!("не удалось открыть {}", path.display()))?;
    read_matrix_from(BufReader::new(file), size)
        .with_context(|| format!("чтение матрицы из {}", path.display()))
}

/// Читает матрицу из любого буферизованного источника
pub fn read_matrix_from<R: BufRead>(reader: R, size: usize) -> Result<Vec<i32>> {
    let n = size * size;
    let mut values = Vec::with_capacity(n);
    'outer: for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("ошибка ввода-вывода")?;
        for token in line.split_whitespace() {
            let value: i32 = token
                .parse()
                .with_context(|| format!("строка {}: \"{}\" не целое число", line_no + 1, token))?;
            values.push(value);
            if values.len() == n {
                break 'outer;
            }
        }
    }
    if values.len() < n {
        bail!("ожидалось {} значений, в файле только {}", n, values.len());
    }
    Ok(values)
}

/// Пишет матрицу построчно, по `size` значений в строке
pub fn write_matrix(path: &Path, data: &[i32], size: usize) -> Result<()> {
    ensure!(
        data.len() == size * size,
        "матрица порядка {} требует {} значений, передано {}",
        size,
        size * size,
        data.len()
    );
    let file =
        File::create(path).with_context(|| format!("не удалось создать {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for row in data.chunks(size) {
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                write!(writer, " ")?;
            }
            write!(writer, "{value}")?;
        }
        writeln!(writer)?;
    }
    writer
        .flush()
        .with_context(|| format!("запись в {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_values_across_lines() {
        let data = "1 2\n3 4\n";
        assert_eq!(
            read_matrix_from(Cursor::new(data), 2).unwrap(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn layout_does_not_matter_only_order() {
        // fscanf не различает переводы строк и пробелы
        let data = "1\n2 3\t4  5 6 7 8 9";
        assert_eq!(
            read_matrix_from(Cursor::new(data), 3).unwrap(),
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9]
        );
    }

    #[test]
    fn negative_values_are_parsed() {
        let data = "-1 -2 -3 4";
        assert_eq!(
            read_matrix_from(Cursor::new(data), 2).unwrap(),
            vec![-1, -2, -3, 4]
        );
    }

    #[test]
    fn extra_trailing_content_is_ignored() {
        let data = "1 2 3 4 999 это не читается";
        assert_eq!(
            read_matrix_from(Cursor::new(data), 2).unwrap(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn short_file_is_an_error() {
        let err = read_matrix_from(Cursor::new("1 2 3"), 2).unwrap_err();
        assert!(err.to_string().contains("ожидалось 4"));
    }

    #[test]
    fn garbage_token_is_an_error() {
        let err = read_matrix_from(Cursor::new("1 2 x 4"), 2).unwrap_err();
        assert!(format!("{err:#}").contains("\"x\""));
    }

    #[test]
    fn write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Matrix1.txt");
        let data: Vec<i32> = (-8..8).collect();
        write_matrix(&path, &data, 4).unwrap();
        assert_eq!(read_matrix(&path, 4).unwrap(), data);
    }

    #[test]
    fn write_rejects_wrong_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        assert!(write_matrix(&path, &[1, 2, 3], 2).is_err());
    }

    #[test]
    fn written_file_has_one_row_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.txt");
        write_matrix(&path, &[1, 2, 3, 4], 2).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "1 2\n3 4\n");
    }
}
