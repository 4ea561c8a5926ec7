//! Line-oriented command interpreter over a mounted `FileSystem<Disk>`.
//!
//! One command per line, whitespace separated. Every command writes its
//! result (or an `Error occurred:` diagnostic) to the output sink.

use std::io::{BufRead, Write};

use log::{debug, warn};

use crate::config::{Geometry, MAX_FILE_SIZE};
use crate::disk::Disk;
use crate::error::status;
use crate::fs::FileSystem;
use crate::snapshot::ImageStore;
use crate::{Error, Result};

pub const HELP: &str = concat!(
    "Available commands: \n",
    " (in <diskName>), (sv <diskName>),\n",
    " (dr), (cr <fileName>), (op <fileName>), (cl <fileIndex>), (de <fileName>),\n",
    " (rd <fileIndex> <count>), (wr <fileIndex> <char> <count>), (sk <fileIndex> <pos>),\n",
    " (drop <diskName>)\n",
    " (end)",
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command<'a> {
    Init(&'a str),
    Save(&'a str),
    Create(&'a str),
    Destroy(&'a str),
    Open(&'a str),
    Close(&'a str),
    Read(&'a str, &'a str),
    Write(&'a str, &'a str, &'a str),
    Seek(&'a str, &'a str),
    Dir,
    Drop(&'a str),
    End,
}

/// `None` for unknown commands and wrong argument counts.
fn parse<'a>(args: &[&'a str]) -> Option<Command<'a>> {
    let cmd = match *args {
        ["in", disk] => Command::Init(disk),
        ["sv", disk] => Command::Save(disk),
        ["cr", name] => Command::Create(name),
        ["de", name] => Command::Destroy(name),
        ["op", name] => Command::Open(name),
        ["cl", index] => Command::Close(index),
        ["rd", index, count] => Command::Read(index, count),
        ["wr", index, ch, count] => Command::Write(index, ch, count),
        ["sk", index, pos] => Command::Seek(index, pos),
        ["dr"] => Command::Dir,
        ["drop", disk] => Command::Drop(disk),
        ["end"] => Command::End,
        _ => return None,
    };
    Some(cmd)
}

/// OFT indices are 1-based from the user's point of view; slot 0 is the directory.
fn slot(index: i64) -> Result<usize> {
    if index <= 0 {
        return Err(Error::InvalidArgument("Open files indexing starts from 1"));
    }
    usize::try_from(index).map_err(|_| Error::InvalidArgument("Open file index is too large"))
}

fn count(count: i64) -> Result<usize> {
    usize::try_from(count).map_err(|_| Error::InvalidArgument("Count must not be negative"))
}

pub struct Shell<W: Write> {
    store: ImageStore,
    geometry: Geometry,
    fs: Option<FileSystem<Disk>>,
    out: W,
}

impl<W: Write> Shell<W> {
    pub fn new(store: ImageStore, geometry: Geometry, out: W) -> Self {
        Self { store, geometry, fs: None, out }
    }

    /// Executes lines from `input` until `end` or end of input.
    /// Bytes that are not UTF-8 are replaced, so a garbled line is only a bad command.
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<()> {
        for line in input.split(b'\n') {
            let line = line?;
            if self.execute(&String::from_utf8_lossy(&line))? == Flow::Exit {
                break;
            }
        }
        Ok(())
    }

    /// `run` framed by the session banners of the interactive tool.
    pub fn start<R: BufRead>(&mut self, input: R) -> Result<()> {
        writeln!(self.out, "CLI started")?;
        self.run(input)?;
        writeln!(self.out, "Finishing CLI")?;
        Ok(())
    }

    /// Executes one line. Only failures to write the output are returned;
    /// filesystem errors are reported on the output.
    pub fn execute(&mut self, line: &str) -> Result<Flow> {
        let args: Vec<&str> = line.split_whitespace().collect();
        if args.is_empty() {
            return Ok(Flow::Continue);
        }
        let Some(cmd) = parse(&args) else {
            writeln!(self.out, "{}", HELP)?;
            return Ok(Flow::Continue);
        };
        if cmd == Command::End {
            return Ok(Flow::Exit);
        }

        let result = self.dispatch(cmd);
        debug!("{:?} -> status {}", cmd, status(&result));
        if let Err(e) = result {
            if e.is_io() && matches!(cmd, Command::Drop(_)) {
                writeln!(self.out, "Drop operation failed")?;
            } else {
                writeln!(self.out, "Error occurred:\n\t{}", e)?;
            }
        }
        Ok(Flow::Continue)
    }

    fn fs(&mut self) -> Result<&mut FileSystem<Disk>> {
        self.fs.as_mut().ok_or(Error::NotMounted)
    }

    fn dispatch(&mut self, cmd: Command<'_>) -> Result<()> {
        match cmd {
            Command::Init(disk) => self.init(disk),
            Command::Save(disk) => {
                let fs = self.fs.as_mut().ok_or(Error::NotMounted)?;
                let closed = fs.save(&self.store, disk)?;
                for index in closed {
                    writeln!(self.out, "File {} closed", index)?;
                }
                writeln!(self.out, "Disk saved")?;
                Ok(())
            }
            Command::Create(name) => {
                self.fs()?.create(name)?;
                writeln!(self.out, "File {} created", name)?;
                Ok(())
            }
            Command::Destroy(name) => {
                self.fs()?.destroy(name)?;
                writeln!(self.out, "File {} deleted", name)?;
                Ok(())
            }
            Command::Open(name) => {
                let index = self.fs()?.open(name)?;
                writeln!(self.out, "File {} opened, index={}", name, index)?;
                Ok(())
            }
            Command::Close(index) => {
                let index: i64 = index
                    .parse()
                    .map_err(|_| Error::InvalidArgument("Close operation arg must be integer"))?;
                self.fs()?.close(slot(index)?)?;
                writeln!(self.out, "File {} closed", index)?;
                Ok(())
            }
            Command::Read(index, n) => {
                let (index, n) = match (index.parse::<i64>(), n.parse::<i64>()) {
                    (Ok(index), Ok(n)) => (index, n),
                    _ => return Err(Error::InvalidArgument("Read operation args must be integer")),
                };
                let n = count(n)?;
                let index = slot(index)?;
                let mut buf = vec![0u8; n.min(MAX_FILE_SIZE)];
                let result = self.fs()?.read(index, &mut buf);
                match result {
                    Ok(read) => {
                        let payload: String = buf[..read].iter().map(|&b| b as char).collect();
                        writeln!(self.out, "<{}> bytes read: <{}>", read, payload)?;
                        Ok(())
                    }
                    Err(Error::EmptyRead) => {
                        writeln!(self.out, "<File is empty>")?;
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            Command::Write(index, ch, n) => {
                let parsed = (index.parse::<i64>(), ch.chars().next(), n.parse::<i64>());
                let (index, ch, n) = match parsed {
                    (Ok(index), Some(ch), Ok(n)) => (index, ch, n),
                    _ => {
                        return Err(Error::InvalidArgument(
                            "Write operation args must be integer char integer",
                        ));
                    }
                };
                if !ch.is_ascii() {
                    return Err(Error::InvalidArgument("Write character must be ASCII"));
                }
                let n = count(n)?;
                let index = slot(index)?;
                let src = vec![ch as u8; n.min(MAX_FILE_SIZE)];
                let written = self.fs()?.write(index, &src)?;
                writeln!(self.out, "<{}> bytes written", written)?;
                Ok(())
            }
            Command::Seek(index, pos) => {
                let (index, pos) = match (index.parse::<i64>(), pos.parse::<i64>()) {
                    (Ok(index), Ok(pos)) => (index, pos),
                    _ => return Err(Error::InvalidArgument("Seek operation args must be integer")),
                };
                let pos = usize::try_from(pos)
                    .map_err(|_| Error::InvalidArgument("Position must not be negative"))?;
                let pos = self.fs()?.seek(slot(index)?, pos)?;
                writeln!(self.out, "Current position is {}", pos)?;
                Ok(())
            }
            Command::Dir => {
                let files = self.fs()?.list();
                for file in files {
                    writeln!(self.out, "\t{} <{}>", file.name, file.length)?;
                }
                Ok(())
            }
            Command::Drop(disk) => {
                self.store.remove(disk)?;
                writeln!(self.out, "{} deleted", disk)?;
                Ok(())
            }
            Command::End => Ok(()),
        }
    }

    /// Mounts the image `disk`, or a fresh disk if there is none or it
    /// cannot be loaded. Any previous mount is discarded unsaved.
    fn init(&mut self, disk: &str) -> Result<()> {
        if self.fs.take().is_some() {
            warn!("replacing the mounted filesystem without saving it");
        }
        if self.store.exists(disk) {
            match FileSystem::load(&self.store, disk) {
                Ok(fs) => {
                    self.fs = Some(fs);
                    writeln!(self.out, "Disk restored")?;
                    return Ok(());
                }
                Err(e) => warn!("cannot load disk {}: {}; starting from a zeroed disk", disk, e),
            }
        }
        self.fs = Some(FileSystem::format(Disk::new(self.geometry))?);
        writeln!(self.out, "Disk initialized")?;
        Ok(())
    }

    pub fn filesystem(&self) -> Option<&FileSystem<Disk>> {
        self.fs.as_ref()
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }
}
