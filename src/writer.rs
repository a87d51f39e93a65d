use std::io::{Result, Write};

use crate::xref::{Xref, XrefEntry};
use crate::{Dictionary, Document, Object, Stream, StringFormat};

impl Document {
    /// Serialize the document: header, binary mark, objects, classic xref table, trailer.
    ///
    /// /Size in the trailer is set to `max_id + 1`.
    pub fn save_to<W: Write>(&mut self, target: &mut W) -> Result<()> {
        let mut target = CountingWrite {
            inner: target,
            bytes_written: 0,
        };
        let mut xref = Xref::new(self.max_id + 1);

        writeln!(target, "%PDF-{}", self.version)?;
        if !self.binary_mark.is_empty() {
            target.write_all(b"%")?;
            target.write_all(&self.binary_mark)?;
            target.write_all(b"\n")?;
        }

        for (&(id, generation), object) in &self.objects {
            Writer::write_indirect_object(&mut target, id, generation, object, &mut xref)?;
        }

        let xref_start = target.bytes_written;
        Writer::write_xref(&mut target, &xref)?;

        self.trailer.set("Size", i64::from(self.max_id + 1));
        target.write_all(b"trailer\n")?;
        Writer::write_dictionary(&mut target, &self.trailer)?;
        write!(target, "\nstartxref\n{}\n%%EOF\n", xref_start)?;

        Ok(())
    }

    /// Serialize the document into a new buffer.
    pub fn save_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.save_to(&mut buffer)?;
        Ok(buffer)
    }
}

pub struct Writer;

impl Writer {
    fn need_separator(object: &Object) -> bool {
        matches!(
            *object,
            Object::Null | Object::Boolean(_) | Object::Integer(_) | Object::Real(_) | Object::Reference(_)
        )
    }

    fn need_end_separator(object: &Object) -> bool {
        Self::need_separator(object) || matches!(*object, Object::Name(_) | Object::Stream(_))
    }

    fn write_xref(file: &mut dyn Write, xref: &Xref) -> Result<()> {
        writeln!(file, "xref\n0 {}", xref.size)?;

        let mut write_xref_entry =
            |offset: u32, generation: u16, kind: char| writeln!(file, "{:>010} {:>05} {} ", offset, generation, kind);
        write_xref_entry(0, 65535, 'f')?;

        for obj_id in 1..xref.size {
            match xref.get(obj_id) {
                Some(&XrefEntry::Normal { offset, generation }) => write_xref_entry(offset, generation, 'n')?,
                _ => write_xref_entry(0, 65535, 'f')?,
            }
        }
        Ok(())
    }

    fn write_indirect_object<W: Write>(
        file: &mut CountingWrite<&mut W>, id: u32, generation: u16, object: &Object, xref: &mut Xref,
    ) -> Result<()> {
        let offset = u32::try_from(file.bytes_written)
            .map_err(|_| std::io::Error::other("output exceeds the range of xref offsets"))?;
        xref.insert(id, XrefEntry::Normal { offset, generation });
        write!(
            file,
            "{} {} obj{}",
            id,
            generation,
            if Writer::need_separator(object) { " " } else { "" }
        )?;
        Writer::write_object(file, object)?;
        writeln!(
            file,
            "{}endobj",
            if Writer::need_end_separator(object) { " " } else { "" }
        )?;
        Ok(())
    }

    pub fn write_object(file: &mut dyn Write, object: &Object) -> Result<()> {
        match object {
            Object::Null => file.write_all(b"null"),
            Object::Boolean(true) => file.write_all(b"true"),
            Object::Boolean(false) => file.write_all(b"false"),
            Object::Integer(value) => {
                let mut buffer = itoa::Buffer::new();
                file.write_all(buffer.format(*value).as_bytes())
            }
            Object::Real(value) => Writer::write_real(file, *value),
            Object::Name(name) => Writer::write_name(file, name),
            Object::String(text, format) => Writer::write_string(file, text, format),
            Object::Array(array) => Writer::write_array(file, array),
            Object::Dictionary(dict) => Writer::write_dictionary(file, dict),
            Object::Stream(stream) => Writer::write_stream(file, stream),
            Object::Reference(id) => write!(file, "{} {} R", id.0, id.1),
        }
    }

    /// PDF has no exponent notation; non-finite values are written as 0.
    fn write_real(file: &mut dyn Write, value: f32) -> Result<()> {
        if value.is_finite() {
            write!(file, "{}", value)
        } else {
            file.write_all(b"0")
        }
    }

    fn write_name(file: &mut dyn Write, name: &[u8]) -> Result<()> {
        file.write_all(b"/")?;
        for &byte in name {
            // Delimiters, white-space and bytes outside 33..=126 become # sequences.
            if b" \t\n\r\x0C()<>[]{}/%#".contains(&byte) || !(33..=126).contains(&byte) {
                write!(file, "#{:02X}", byte)?;
            } else {
                file.write_all(&[byte])?;
            }
        }
        Ok(())
    }

    fn write_string(file: &mut dyn Write, text: &[u8], format: &StringFormat) -> Result<()> {
        match format {
            // Backslashes and unbalanced parentheses are escaped. A bare \r would read back as \n.
            StringFormat::Literal => {
                let mut escape_indice = Vec::new();
                let mut parentheses = Vec::new();
                for (index, &byte) in text.iter().enumerate() {
                    match byte {
                        b'(' => parentheses.push(index),
                        b')' => {
                            if parentheses.pop().is_none() {
                                escape_indice.push(index);
                            }
                        }
                        b'\\' | b'\r' => escape_indice.push(index),
                        _ => {}
                    }
                }
                escape_indice.append(&mut parentheses);
                escape_indice.sort_unstable();

                file.write_all(b"(")?;
                let mut start = 0;
                for index in escape_indice {
                    file.write_all(&text[start..index])?;
                    file.write_all(b"\\")?;
                    file.write_all(&[if text[index] == b'\r' { b'r' } else { text[index] }])?;
                    start = index + 1;
                }
                file.write_all(&text[start..])?;
                file.write_all(b")")?;
            }
            StringFormat::Hexadecimal => {
                file.write_all(b"<")?;
                for &byte in text {
                    write!(file, "{:02X}", byte)?;
                }
                file.write_all(b">")?;
            }
        }
        Ok(())
    }

    fn write_array(file: &mut dyn Write, array: &[Object]) -> Result<()> {
        file.write_all(b"[")?;
        let mut first = true;
        for object in array {
            if first {
                first = false;
            } else if Writer::need_separator(object) {
                file.write_all(b" ")?;
            }
            Writer::write_object(file, object)?;
        }
        file.write_all(b"]")?;
        Ok(())
    }

    fn write_dictionary(file: &mut dyn Write, dictionary: &Dictionary) -> Result<()> {
        file.write_all(b"<<")?;
        for (key, value) in dictionary {
            Writer::write_name(file, key)?;
            if Writer::need_separator(value) {
                file.write_all(b" ")?;
            }
            Writer::write_object(file, value)?;
        }
        file.write_all(b">>")?;
        Ok(())
    }

    fn write_stream(file: &mut dyn Write, stream: &Stream) -> Result<()> {
        Writer::write_dictionary(file, &stream.dict)?;
        file.write_all(b"stream\n")?;
        file.write_all(&stream.content)?;
        file.write_all(b"\nendstream")?;
        Ok(())
    }
}

pub struct CountingWrite<W: Write> {
    inner: W,
    bytes_written: usize,
}

impl<W: Write> Write for CountingWrite<W> {
    #[inline]
    fn write(&mut self, buffer: &[u8]) -> Result<usize> {
        let result = self.inner.write(buffer);
        if let Ok(bytes) = result {
            self.bytes_written += bytes;
        }
        result
    }

    #[inline]
    fn write_all(&mut self, buffer: &[u8]) -> Result<()> {
        self.bytes_written += buffer.len();
        // On error the whole output is discarded, so the count no longer matters.
        self.inner.write_all(buffer)
    }

    #[inline]
    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}
